use crate::core::serializer::Format;
use clap::{Parser, Subcommand};

#[derive(Debug, Clone, Parser)]
#[command(name = "social-graph")]
#[command(about = "Build, export and reload social graph snapshots")]
pub struct CliConfig {
    /// Path to TOML configuration file
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    /// Base directory for relative file paths (overrides config)
    #[arg(long, global = true)]
    pub base_dir: Option<String>,

    #[arg(short, long, global = true, help = "Enable verbose output")]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Build the sample graph and export it
    Demo {
        #[arg(short, long, default_value = "social_network.json")]
        output: String,

        #[arg(short, long, value_enum)]
        format: Option<Format>,
    },

    /// Load an exported file and print what was reconstructed
    Inspect {
        input: String,

        #[arg(short, long, value_enum)]
        format: Option<Format>,
    },

    /// Load an exported file and write it in another format
    Convert {
        input: String,
        output: String,

        #[arg(long, value_enum)]
        from: Option<Format>,

        #[arg(long, value_enum)]
        to: Option<Format>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_convert_with_explicit_formats() {
        let cli = CliConfig::parse_from([
            "social-graph",
            "--verbose",
            "convert",
            "in.data",
            "out.data",
            "--from",
            "json",
            "--to",
            "xml",
        ]);
        assert!(cli.verbose);
        match cli.command {
            Command::Convert { input, from, to, .. } => {
                assert_eq!(input, "in.data");
                assert_eq!(from, Some(Format::Json));
                assert_eq!(to, Some(Format::Xml));
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_demo_defaults() {
        let cli = CliConfig::parse_from(["social-graph", "demo"]);
        assert!(matches!(
            cli.command,
            Command::Demo { ref output, format: None } if output == "social_network.json"
        ));
    }
}
