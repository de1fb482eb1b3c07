use crate::cli::args::{Cli, CompletionCommands, CompletionHelperCommands};
use crate::store::listing::COLUMN_NAMES;
use crate::store::FileCertificateStore;
use crate::utils::errors::Result;
use crate::utils::output::OutputFormat;
use crate::utils::paths::PROGRAM_NAME;
use clap::CommandFactory;
use clap_complete::{generate, Shell};
use std::io;

pub fn handle_completion_command(command: &CompletionCommands) -> Result<()> {
    let shell = command.shell();
    let mut cmd = Cli::command();

    // For bash, add store name and column completion first
    if matches!(shell, Shell::Bash) {
        println!("# Enhanced completion for {PROGRAM_NAME} store names and columns");
        print!(
            r#"
_acme_cert_rs_complete_stores() {{
    local stores
    stores=$({PROGRAM_NAME} completion-helper stores 2>/dev/null)
    COMPREPLY=($(compgen -W "$stores" -- "${{cur}}"))
}}

_acme_cert_rs_complete_columns() {{
    local columns
    columns=$({PROGRAM_NAME} completion-helper columns 2>/dev/null)

    local current_word="${{cur}}"
    local prefix=""

    if [[ "$current_word" == +* ]]; then
        prefix="+"
        current_word="${{current_word:1}}"
    fi

    # Complete only the part after the last comma
    if [[ "$current_word" == *,* ]]; then
        prefix="${{prefix}}${{current_word%,*}},"
        current_word="${{current_word##*,}}"
    fi

    local word_list=""
    for col in $columns; do
        if [[ "$col" == "$current_word"* ]]; then
            word_list="$word_list ${{prefix}}${{col}}"
        fi
    done

    COMPREPLY=($(compgen -W "$word_list" -- "${{cur}}"))
}}

_acme_cert_rs_override() {{
    local cur prev words cword
    _init_completion || return

    case "$prev" in
        "--store")
            _acme_cert_rs_complete_stores
            return 0
            ;;
        "--columns")
            _acme_cert_rs_complete_columns
            return 0
            ;;
    esac

    # Fall back to the original completion
    _{PROGRAM_NAME} "$@"
}}

"#
        );

        generate(shell, &mut cmd, PROGRAM_NAME, &mut io::stdout());

        println!();
        println!("# Override the completion function");
        println!("complete -F _acme_cert_rs_override {PROGRAM_NAME}");
    } else {
        generate(shell, &mut cmd, PROGRAM_NAME, &mut io::stdout());
    }

    Ok(())
}

pub fn handle_completion_helper_command(
    command: &CompletionHelperCommands,
    store: &FileCertificateStore,
    output: &OutputFormat,
) {
    match command {
        CompletionHelperCommands::Stores => {
            // Completion should not show errors
            if let Ok(names) = store.store_names() {
                output.print_list(&names);
            }
        }
        CompletionHelperCommands::Columns => output.print_list(COLUMN_NAMES),
    }
}
