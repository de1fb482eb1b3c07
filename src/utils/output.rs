use crate::store::StoreColumn;
use std::fmt::Display;

/// Trait for types that can provide column values
pub trait GetColumnValue {
    fn get_column_value(&self, column: &StoreColumn) -> String;
}

/// Output format configuration
#[derive(Clone, Debug)]
pub struct OutputFormat {
    pub raw: bool,
}

/// Build table data from entries and columns
pub fn build_table_data<T>(
    certificates: &[T],
    parsed_columns: &[StoreColumn],
) -> Vec<Vec<String>>
where
    T: GetColumnValue,
{
    certificates
        .iter()
        .map(|cert| {
            parsed_columns
                .iter()
                .map(|col| cert.get_column_value(col))
                .collect()
        })
        .collect()
}

impl OutputFormat {
    pub fn new(raw: bool) -> Self {
        Self { raw }
    }

    /// Print tabular data - either raw (tab-separated) or formatted (column-aligned)
    pub fn print_table<T>(&self, data: &[Vec<T>])
    where
        T: Display + AsRef<str>,
    {
        for line in self.render_table(data) {
            println!("{line}");
        }
    }

    /// Render tabular data into output lines
    pub fn render_table<T>(&self, data: &[Vec<T>]) -> Vec<String>
    where
        T: Display + AsRef<str>,
    {
        if data.is_empty() {
            return Vec::new();
        }

        if self.raw {
            // Raw output: tab-separated values
            data.iter()
                .map(|row| {
                    row.iter()
                        .map(|cell| cell.as_ref())
                        .collect::<Vec<_>>()
                        .join("\t")
                })
                .collect()
        } else {
            // Formatted output: column-aligned like `column -t`
            Self::format_table(data)
        }
    }

    /// Print single-column data
    pub fn print_list<T>(&self, items: &[T])
    where
        T: Display,
    {
        for item in items {
            println!("{item}");
        }
    }

    /// Print key-value pairs
    pub fn print_key_value<K, V>(&self, pairs: &[(K, V)])
    where
        K: Display + AsRef<str>,
        V: Display + AsRef<str>,
    {
        let data: Vec<Vec<String>> = pairs
            .iter()
            .map(|(k, v)| vec![k.to_string(), v.to_string()])
            .collect();

        self.print_table(&data);
    }

    fn format_table<T>(data: &[Vec<T>]) -> Vec<String>
    where
        T: Display + AsRef<str>,
    {
        // Calculate column widths
        let num_cols = data.iter().map(Vec::len).max().unwrap_or(0);
        let mut col_widths = vec![0; num_cols];

        for row in data {
            for (i, cell) in row.iter().enumerate() {
                col_widths[i] = col_widths[i].max(cell.as_ref().len());
            }
        }

        data.iter()
            .map(|row| {
                let formatted_cells: Vec<String> = row
                    .iter()
                    .enumerate()
                    .map(|(i, cell)| {
                        if i == row.len() - 1 {
                            // Last column - no padding needed
                            cell.to_string()
                        } else {
                            format!("{:<width$}", cell.as_ref(), width = col_widths[i])
                        }
                    })
                    .collect();
                formatted_cells.join("  ")
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Vec<Vec<&'static str>> {
        vec![
            vec!["thumbprint", "cn", "not_after"],
            vec!["ab12", "www.example.com", "2026-01-01"],
        ]
    }

    #[test]
    fn test_raw_output() {
        let lines = OutputFormat::new(true).render_table(&sample());
        assert_eq!(
            lines,
            vec![
                "thumbprint\tcn\tnot_after",
                "ab12\twww.example.com\t2026-01-01"
            ]
        );
    }

    #[test]
    fn test_formatted_output() {
        let lines = OutputFormat::new(false).render_table(&sample());
        assert_eq!(
            lines,
            vec![
                "thumbprint  cn               not_after",
                "ab12        www.example.com  2026-01-01"
            ]
        );
    }

    #[test]
    fn test_empty_table_renders_nothing() {
        let data: Vec<Vec<String>> = Vec::new();
        assert!(OutputFormat::new(false).render_table(&data).is_empty());
    }
}
