use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueHint, builder::BoolishValueParser};

/// Command-line arguments for the mdrender binary.
#[derive(Debug, Parser)]
#[command(name = "mdrender", version, about = "Markdown to sanitized HTML renderer")]
pub struct CliArgs {
    /// Optional path to a configuration file.
    #[arg(long = "config-file", env = "MDRENDER_CONFIG_FILE", value_name = "PATH")]
    pub config_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Run the HTTP render endpoint.
    Serve(Box<ServeArgs>),
    /// Render a Markdown file (or stdin) to sanitized HTML on stdout.
    Render(RenderArgs),
}

#[derive(Debug, Args, Default, Clone)]
pub struct ServeArgs {
    #[command(flatten)]
    pub overrides: ServeOverrides,
}

#[derive(Debug, Args, Default, Clone)]
pub struct SanitizeOverrides {
    /// Override the attribute policy (strip-all|links-and-images).
    #[arg(long = "sanitize-attribute-policy", value_name = "POLICY")]
    pub attribute_policy: Option<String>,
}

#[derive(Debug, Args, Default, Clone)]
pub struct ServeOverrides {
    #[command(flatten)]
    pub sanitize: SanitizeOverrides,

    /// Override the listener host.
    #[arg(long = "server-host", value_name = "HOST")]
    pub server_host: Option<String>,

    /// Override the listener port.
    #[arg(long = "server-port", value_name = "PORT")]
    pub server_port: Option<u16>,

    /// Override the base log level (trace|debug|info|warn|error).
    #[arg(long = "log-level", value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Toggle JSON logging.
    #[arg(
        long = "log-json",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new()
    )]
    pub log_json: Option<bool>,

    /// Override the route the render endpoint is mounted on.
    #[arg(long = "render-path", value_name = "PATH")]
    pub render_path: Option<String>,

    /// Override the maximum accepted request body size in bytes.
    #[arg(long = "render-max-body-bytes", value_name = "BYTES")]
    pub render_max_body_bytes: Option<u64>,
}

#[derive(Debug, Args, Clone)]
pub struct RenderArgs {
    #[command(flatten)]
    pub sanitize: SanitizeOverrides,

    /// Markdown file to render; stdin is read when omitted.
    #[arg(value_name = "FILE", value_hint = ValueHint::FilePath)]
    pub file: Option<PathBuf>,
}
