use crate::acme::HttpAcmeClient;
use crate::cert::artifacts::{ArtifactWriter, PersistedArtifacts};
use crate::cert::issued::LoadedCertificate;
use crate::cert::{CertificateService, IdentifierSet, Thumbprint};
use crate::cli::args::*;
use crate::cli::completions::{handle_completion_command, handle_completion_helper_command};
use crate::config::Settings;
use crate::store::listing::{parse_columns, print_entries};
use crate::store::{
    self, CertificateStore, FileCertificateStore, InstallReport, OpenMode, StoreEntry,
};
use crate::utils::errors::{AcmeCertError, Result};
use crate::utils::output::OutputFormat;
use crate::utils::paths::{AppPaths, ArtifactDirectory};
use std::fs;
use std::io;

/// Everything a command needs, built once from the settings
struct Context {
    settings: Settings,
    store: FileCertificateStore,
    output: OutputFormat,
}

impl Context {
    fn personal_store<'a>(&'a self, requested: &'a Option<String>) -> &'a str {
        requested.as_deref().unwrap_or(&self.settings.store_name)
    }

    fn service(&self) -> Result<CertificateService<HttpAcmeClient>> {
        let fallback = AppPaths::config_dir()?;
        let dir = ArtifactDirectory::resolve(self.settings.certificate_path.as_deref(), &fallback);
        let client = HttpAcmeClient::new(self.settings.base_uri.clone())?;
        let writer = ArtifactWriter::new(dir, &self.settings);
        Ok(CertificateService::new(client, writer, &self.settings))
    }
}

pub async fn handle_command(cli: Cli) -> Result<()> {
    // Initialize logging - always to stderr
    if !cli.quiet {
        let log_level = match cli.verbose {
            0 => "acme_cert_rs=warn",
            1 => "acme_cert_rs=info",
            2 => "acme_cert_rs=debug",
            _ => "acme_cert_rs=trace",
        };

        tracing_subscriber::fmt()
            .with_writer(io::stderr)
            .with_env_filter(log_level)
            .init();
    }

    let output = OutputFormat::new(cli.raw);

    if let Commands::Completion { ref command } = cli.command {
        return handle_completion_command(command);
    }

    let config_file = match cli.config {
        Some(ref path) => path.clone(),
        None => AppPaths::config_file()?,
    };
    let mut settings = Settings::load(&config_file);
    if let Some(ref uri) = cli.base_uri {
        settings = settings.with_base_uri(uri);
    }
    tracing::debug!("Authority base URI: {}", settings.base_uri);

    let context = Context {
        store: FileCertificateStore::new(&settings.store_root),
        settings,
        output,
    };
    tracing::debug!("Trust store root: {}", context.store.root().display());

    match cli.command {
        Commands::Request {
            hosts,
            install,
            store,
        } => handle_request(&context, hosts, install, &store).await,
        Commands::Renew { hosts, store } => handle_renew(&context, hosts, &store).await,
        Commands::Install {
            archive,
            store,
            friendly_name,
            ask_password,
        } => {
            let password = if ask_password {
                rpassword::prompt_password("Archive password: ").map_err(|e| {
                    AcmeCertError::InvalidInput(format!("Failed to read password: {e}"))
                })?
            } else {
                context.settings.pfx_password.clone()
            };
            let friendly_name = friendly_name.unwrap_or_else(|| {
                archive
                    .file_stem()
                    .map(|stem| stem.to_string_lossy().into_owned())
                    .unwrap_or_default()
            });

            let bytes = fs::read(&archive)?;
            let certificate = LoadedCertificate::from_archive(
                &bytes,
                &password,
                friendly_name,
                context.settings.private_key_exportable,
            )?;
            let personal_store = context.personal_store(&store);
            let intermediate_store = &context.settings.intermediate_store_name;
            let report =
                store::install(&context.store, &certificate, personal_store, intermediate_store)?;
            print_install_report(&context.output, &report, personal_store, intermediate_store);
            Ok(())
        }
        Commands::Uninstall { thumbprint, store } => {
            let thumbprint = Thumbprint::parse(&thumbprint)
                .map_err(|e| AcmeCertError::InvalidInput(format!("Invalid thumbprint: {e}")))?;
            let store_name = context.personal_store(&store);
            let removed = store::uninstall(&context.store, &thumbprint, store_name)?;
            println!("Removed {removed} certificate(s) from '{store_name}'");
            Ok(())
        }
        Commands::Lookup { host, store } => {
            match store::lookup(&context.store, &host, context.personal_store(&store))? {
                Some(entry) => {
                    print_entry(&context.output, &entry);
                    Ok(())
                }
                None => Err(AcmeCertError::CertNotFound(format!(
                    "No installed certificate for {host}"
                ))),
            }
        }
        Commands::Store { command } => handle_store_command(&context, command),
        Commands::CompletionHelper { command } => {
            handle_completion_helper_command(&command, &context.store, &context.output);
            Ok(())
        }
        Commands::Completion { .. } => Ok(()),
    }
}

async fn handle_request(
    context: &Context,
    hosts: Vec<String>,
    install: bool,
    store: &Option<String>,
) -> Result<()> {
    let identifiers = IdentifierSet::new(hosts)?;
    let service = context.service()?;
    let persisted = service.request_certificate(&identifiers).await?;
    print_persisted(&context.output, &persisted);

    if install {
        let personal_store = context.personal_store(store);
        let intermediate_store = &context.settings.intermediate_store_name;
        let report = store::install(
            &context.store,
            &persisted.certificate,
            personal_store,
            intermediate_store,
        )?;
        print_install_report(&context.output, &report, personal_store, intermediate_store);
    }
    Ok(())
}

async fn handle_renew(context: &Context, hosts: Vec<String>, store: &Option<String>) -> Result<()> {
    let identifiers = IdentifierSet::new(hosts)?;
    let personal_store = context.personal_store(store);
    let intermediate_store = &context.settings.intermediate_store_name;
    let service = context.service()?;
    let outcome = service
        .renew(&identifiers, &context.store, personal_store, intermediate_store)
        .await?;

    print_persisted(&context.output, &outcome.artifacts);
    print_install_report(&context.output, &outcome.install, personal_store, intermediate_store);
    if let Some(replaced) = outcome.replaced {
        println!("Replaced {replaced}");
    }
    Ok(())
}

fn handle_store_command(context: &Context, command: StoreCommands) -> Result<()> {
    match command {
        StoreCommands::List { store, columns } => {
            let columns = parse_columns(columns.as_deref())?;
            let store_name = context.personal_store(&store);

            let handle = context.store.open(store_name, OpenMode::ReadOnly)?;
            let entries = handle.entries();
            handle.close()?;
            let mut entries = entries?;

            // Newest first
            entries.sort_by(|a, b| b.metadata.not_before.cmp(&a.metadata.not_before));
            print_entries(&entries, &columns, &context.output, true);
            Ok(())
        }
        StoreCommands::Names => {
            context.output.print_list(&context.store.store_names()?);
            Ok(())
        }
    }
}

fn print_persisted(output: &OutputFormat, persisted: &PersistedArtifacts) {
    let metadata = &persisted.certificate.metadata;
    let mut pairs = vec![
        ("Thumbprint", metadata.thumbprint.to_string()),
        ("Friendly Name", persisted.certificate.friendly_name.clone()),
        ("Not After", metadata.not_after.format("%Y-%m-%d %H:%M").to_string()),
    ];
    pairs.extend(
        persisted
            .files
            .iter()
            .map(|file| ("File", file.display().to_string())),
    );
    if persisted.archive.is_none() {
        pairs.push(("Archive", "not written".to_string()));
    }
    output.print_key_value(&pairs);
}

fn print_install_report(
    output: &OutputFormat,
    report: &InstallReport,
    personal_store: &str,
    intermediate_store: &str,
) {
    let pairs: Vec<(&str, String)> = report
        .personal
        .iter()
        .map(|thumbprint| (personal_store, thumbprint.to_string()))
        .chain(
            report
                .intermediate
                .iter()
                .map(|thumbprint| (intermediate_store, thumbprint.to_string())),
        )
        .collect();
    output.print_key_value(&pairs);

    for (thumbprint, reason) in &report.failed {
        eprintln!("Not installed: {thumbprint}: {reason}");
    }
}

fn print_entry(output: &OutputFormat, entry: &StoreEntry) {
    let metadata = &entry.metadata;
    let pairs = vec![
        ("Thumbprint", metadata.thumbprint.to_string()),
        ("Friendly Name", entry.friendly_name.clone()),
        ("CN", metadata.cn.clone()),
        ("SANs", metadata.sans.join(",")),
        ("Issuer", metadata.issuer.clone()),
        ("Not Before", metadata.not_before.format("%Y-%m-%d %H:%M").to_string()),
        ("Not After", metadata.not_after.format("%Y-%m-%d %H:%M").to_string()),
        (
            "Private Key",
            (if entry.has_private_key() { "yes" } else { "no" }).to_string(),
        ),
    ];
    output.print_key_value(&pairs);
}
