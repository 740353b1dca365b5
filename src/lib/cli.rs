use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::ResourceKind;

/// Crane custom resource tool
///
/// Generates the Crane CustomResourceDefinitions and reads or watches Crane
/// resources in a cluster.
#[derive(Parser, Debug)]
#[command(name = "cranectl", author, version, about, styles=get_styles())]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress log output to stdout/stderr (logs still written to file)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Provide context name
    ///
    /// Use if you have multiple clusters in your kubeconfig
    #[arg(long, global = true)]
    pub context: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Print every CustomResourceDefinition, or write one file per CRD
    Crds {
        /// Directory receiving `<group>_<plural>.yaml` files
        #[arg(long, value_name = "DIR")]
        out_dir: Option<PathBuf>,
    },

    /// List resources of a kind
    List {
        /// Kind, plural or short name, e.g. ehpa
        kind: ResourceKind,

        /// Namespace to list; all namespaces when omitted
        #[arg(short, long)]
        namespace: Option<String>,

        /// Label selector, e.g. app=web,tier!=cache
        #[arg(short = 'l', long)]
        selector: Option<String>,

        /// Output format
        #[arg(short, long, value_name = "FORMAT", default_value = "table")]
        output: OutputFormat,
    },

    /// Print one resource
    Get {
        /// Kind, plural or short name
        kind: ResourceKind,

        name: String,

        /// Namespace of the resource; ignored for cluster scoped kinds
        #[arg(short, long)]
        namespace: Option<String>,

        /// Output format
        #[arg(short, long, value_name = "FORMAT", default_value = "yaml")]
        output: OutputFormat,
    },

    /// Stream changes to resources of a kind
    Watch {
        /// Kind, plural or short name
        kind: ResourceKind,

        #[arg(short, long)]
        namespace: Option<String>,

        /// Label selector
        #[arg(short = 'l', long)]
        selector: Option<String>,

        /// Seconds between cache resyncs, 0 disables them
        #[arg(long, default_value = "30")]
        resync_seconds: u64,
    },
}

/// Output format for resources
#[derive(Debug, Clone, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// Display results in an interactive table (TUI)
    Table,
    /// Output results as JSON
    Json,
    /// Output results as YAML
    Yaml,
}

/// Colours for help output
fn get_styles() -> clap::builder::Styles {
    clap::builder::Styles::styled()
        .usage(
            anstyle::Style::new()
                .bold()
                .underline()
                .fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::Yellow))),
        )
        .header(
            anstyle::Style::new()
                .bold()
                .underline()
                .fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::Yellow))),
        )
        .literal(
            anstyle::Style::new().fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::Green))),
        )
        .invalid(
            anstyle::Style::new()
                .bold()
                .fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::Red))),
        )
        .error(
            anstyle::Style::new()
                .bold()
                .fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::Red))),
        )
        .valid(
            anstyle::Style::new()
                .bold()
                .underline()
                .fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::Green))),
        )
        .placeholder(
            anstyle::Style::new().fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::White))),
        )
}
