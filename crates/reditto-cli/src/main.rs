//! Reditto offline tools.
//!
//! Provides the `reditto` binary for checking submissions and replaying saved
//! model replies without network access. Uses the same validator and coercer
//! as the HTTP server, so a verdict here matches what the server would say.

use std::fs;
use std::path::{Path, PathBuf};
use std::process;

use base64::Engine as _;
use clap::{Parser, Subcommand, ValueEnum};

use reditto_core::coerce::{coerce, OutputShape};
use reditto_core::{validate_extraction, validate_grading, PayloadLimits, PipelineError};

/// Reditto essay submission tools.
#[derive(Parser)]
#[command(name = "reditto", about = "Reditto essay submission tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Available subcommands.
#[derive(Subcommand)]
enum Commands {
    /// Check whether an essay file would be accepted for grading.
    #[command(alias = "check-essay")]
    Check {
        /// Path to a UTF-8 text file with the essay.
        #[arg(short, long)]
        file: PathBuf,

        /// Optional essay theme.
        #[arg(short, long)]
        theme: Option<String>,
    },

    /// Check whether an image file would be accepted for text extraction.
    CheckImage {
        /// Path to the essay photo.
        #[arg(short, long)]
        file: PathBuf,
    },

    /// Coerce a saved model reply into a typed result.
    Coerce {
        /// Path to a file holding the raw model reply.
        #[arg(short, long)]
        file: PathBuf,

        /// Expected reply shape.
        #[arg(short, long, value_enum, default_value_t = Shape::Rubric)]
        shape: Shape,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum Shape {
    Text,
    Rubric,
}

impl From<Shape> for OutputShape {
    fn from(shape: Shape) -> Self {
        match shape {
            Shape::Text => OutputShape::PlainText,
            Shape::Rubric => OutputShape::Rubric,
        }
    }
}

/// Exit code for command-line usage errors, kept apart from the I/O code 2.
const USAGE_EXIT_CODE: i32 = 64;

fn main() {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) if e.use_stderr() => {
            let _ = e.print();
            process::exit(USAGE_EXIT_CODE);
        }
        // --help and --version
        Err(e) => e.exit(),
    };
    let limits = PayloadLimits::default();

    let exit_code = match cli.command {
        Commands::Check { file, theme } => run_check_essay(&file, theme, &limits),
        Commands::CheckImage { file } => run_check_image(&file, &limits),
        Commands::Coerce { file, shape } => run_coerce(&file, shape.into()),
    };
    process::exit(exit_code);
}

/// Execute the check subcommand.
///
/// Returns exit code: 0 = accepted, 1 = rejected, 2 = I/O error.
fn run_check_essay(path: &Path, theme: Option<String>, limits: &PayloadLimits) -> i32 {
    let text = match fs::read_to_string(path) {
        Ok(t) => t,
        Err(e) => {
            eprintln!("Error: failed to read '{}': {}", path.display(), e);
            return 2;
        }
    };

    let body = serde_json::json!({ "essayText": text, "theme": theme });
    match validate_grading(body.to_string().as_bytes(), limits) {
        Ok(req) => {
            println!(
                "accepted: {} characters{}",
                req.essay_text.chars().count(),
                req.theme
                    .map(|t| format!(", theme \"{}\"", t))
                    .unwrap_or_default()
            );
            0
        }
        Err(e) => report_rejection(&e),
    }
}

/// Execute the check-image subcommand.
///
/// Returns exit code: 0 = accepted, 1 = rejected, 2 = I/O error.
fn run_check_image(path: &Path, limits: &PayloadLimits) -> i32 {
    let bytes = match fs::read(path) {
        Ok(b) => b,
        Err(e) => {
            eprintln!("Error: failed to read '{}': {}", path.display(), e);
            return 2;
        }
    };

    let encoded = base64::engine::general_purpose::STANDARD.encode(&bytes);
    let body = serde_json::json!({ "imageData": encoded });
    match validate_extraction(body.to_string().as_bytes(), limits) {
        Ok(req) => {
            println!(
                "accepted: {} ({} bytes)",
                req.media_type.mime(),
                req.decoded_len
            );
            0
        }
        Err(e) => report_rejection(&e),
    }
}

/// Execute the coerce subcommand.
///
/// Prints the typed result as JSON. Returns exit code: 0 = success,
/// 1 = malformed reply, 2 = I/O error.
fn run_coerce(path: &Path, shape: OutputShape) -> i32 {
    let raw = match fs::read_to_string(path) {
        Ok(t) => t,
        Err(e) => {
            eprintln!("Error: failed to read '{}': {}", path.display(), e);
            return 2;
        }
    };

    match coerce(&raw, shape) {
        Ok(result) => {
            let json = serde_json::to_string_pretty(&result).unwrap_or_else(|e| {
                format!("{{\"error\": \"failed to serialize result: {}\"}}", e)
            });
            println!("{}", json);
            0
        }
        Err(e) => report_rejection(&e),
    }
}

fn report_rejection(err: &PipelineError) -> i32 {
    eprintln!("rejected ({}): {}", err.kind(), err);
    1
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn temp_file(contents: &[u8]) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(contents).unwrap();
        file
    }

    fn missing_path() -> PathBuf {
        let dir = tempfile::tempdir().unwrap();
        dir.path().join("does-not-exist.txt")
    }

    fn rubric_reply() -> String {
        let mut competencias = serde_json::Map::new();
        for i in 1..=5 {
            competencias.insert(
                format!("competencia{i}"),
                serde_json::json!({ "nota": 160, "titulo": "T", "feedback": "F" }),
            );
        }
        serde_json::json!({
            "competencias": competencias,
            "resumo": "Boa redação",
            "pontosFortes": [],
            "pontosAmelhorar": [],
            "dicas": []
        })
        .to_string()
    }

    #[test]
    fn check_subcommand_parses_with_legacy_alias() {
        for name in ["check", "check-essay"] {
            let cli = Cli::try_parse_from(["reditto", name, "--file", "essay.txt", "--theme", "T"])
                .unwrap();
            match cli.command {
                Commands::Check { file, theme } => {
                    assert_eq!(file, PathBuf::from("essay.txt"));
                    assert_eq!(theme.as_deref(), Some("T"));
                }
                _ => panic!("expected check"),
            }
        }
    }

    #[test]
    fn unknown_subcommand_is_a_usage_error() {
        let err = Cli::try_parse_from(["reditto", "grade", "--file", "x"])
            .err()
            .unwrap();
        assert!(err.use_stderr());
    }

    #[test]
    fn check_exit_codes() {
        let limits = PayloadLimits::default();
        let accepted = temp_file("Uma redação sobre mobilidade urbana. ".repeat(8).as_bytes());
        let too_short = temp_file(b"curta demais");

        assert_eq!(run_check_essay(accepted.path(), None, &limits), 0);
        assert_eq!(
            run_check_essay(accepted.path(), Some("Mobilidade".into()), &limits),
            0
        );
        assert_eq!(run_check_essay(too_short.path(), None, &limits), 1);
        assert_eq!(run_check_essay(&missing_path(), None, &limits), 2);
    }

    #[test]
    fn check_image_exit_codes() {
        let limits = PayloadLimits::default();
        let mut png = vec![0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A];
        png.extend_from_slice(&[0u8; 64]);
        let png = temp_file(&png);
        let text = temp_file(b"not an image at all");

        assert_eq!(run_check_image(png.path(), &limits), 0);
        assert_eq!(run_check_image(text.path(), &limits), 1);
        assert_eq!(run_check_image(&missing_path(), &limits), 2);
    }

    #[test]
    fn coerce_exit_codes() {
        let rubric = temp_file(rubric_reply().as_bytes());
        let text = temp_file(b"  Texto transcrito.  ");
        let blank = temp_file(b"   \n");
        let garbage = temp_file(b"I cannot grade this essay.");

        assert_eq!(run_coerce(rubric.path(), OutputShape::Rubric), 0);
        assert_eq!(run_coerce(text.path(), OutputShape::PlainText), 0);
        assert_eq!(run_coerce(blank.path(), OutputShape::PlainText), 1);
        assert_eq!(run_coerce(garbage.path(), OutputShape::Rubric), 1);
        assert_eq!(run_coerce(&missing_path(), OutputShape::Rubric), 2);
    }
}
