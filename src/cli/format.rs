//! Format output dispatch helpers

/// Dispatch output by format when the JSON branch returns a Result and the
/// human branch prints.
///
/// # Examples
///
/// ```rust,ignore
/// output_by_format!(cli.format,
///     json => print_json(&report),
///     human => { println!("done"); }
/// )?;
/// ```
#[macro_export]
macro_rules! output_by_format {
    ($format:expr, json => $json:expr, human => $human:block) => {
        match $format {
            $crate::cli::OutputFormat::Json => $json,
            $crate::cli::OutputFormat::Human => {
                $human;
                Ok(())
            }
        }
    };
}
