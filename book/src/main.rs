use std::process::ExitCode;

use bindless_book::args::{BookArgs, Command, LintArgs, OutlineArgs, OutputFormat};
use bindless_book::{Book, BookError};
use clap::Parser;

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    bindless_book::init();

    let args = BookArgs::parse();
    let result = match args.command {
        Command::Lint(lint) => run_lint(&lint),
        Command::Outline(outline) => run_outline(&outline),
    };

    match result {
        Ok(code) => code,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run_lint(args: &LintArgs) -> Result<ExitCode, BookError> {
    let book = Book::open(&args.dir)?;
    let mut config = book.config.lint.clone();
    args.apply(&mut config);

    let report = book.lint_with(&config);
    match args.format {
        OutputFormat::Text => {
            for diagnostic in &report.diagnostics {
                println!("{diagnostic}");
            }
            println!(
                "{}: {} errors, {} warnings",
                book.src_dir().display(),
                report.error_count(),
                report.warning_count()
            );
        }
        OutputFormat::Json => {
            println!("{}", report.to_json()?);
        }
    }

    if report.is_failure(config.deny_warnings) {
        Ok(ExitCode::FAILURE)
    } else {
        Ok(ExitCode::SUCCESS)
    }
}

fn run_outline(args: &OutlineArgs) -> Result<ExitCode, BookError> {
    let book = Book::open(&args.dir)?;
    print!("{}", book.summary.outline());
    Ok(ExitCode::SUCCESS)
}
