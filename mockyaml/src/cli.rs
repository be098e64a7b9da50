//! Command-line surface.

use std::path::PathBuf;

use clap::Parser;
use mockyaml_core::schema::TemplateEngine;

/// Declarative YAML-driven HTTP mock server with live reload.
#[derive(Debug, Parser)]
#[command(name = "mockyaml")]
#[command(version)]
#[command(about = "HTTP mock server driven by declarative YAML scenarios")]
pub struct Cli {
    /// Directory tree of scenario YAML files.
    #[arg(long, env = "MOCKYAML_ROOT", default_value = "scenarios")]
    pub root: PathBuf,

    /// Port to listen on.
    #[arg(long, env = "MOCKYAML_PORT", default_value_t = 8080)]
    pub port: u16,

    /// Number of trace ring buffer entries to retain.
    #[arg(long, env = "MOCKYAML_TRACE_SIZE", default_value_t = 256)]
    pub trace_size: usize,

    /// Minimum log level (`trace`, `debug`, `info`, `warn`, `error`).
    #[arg(long, env = "MOCKYAML_LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// Template engine applied to scenarios whose `response.engine` is empty.
    #[arg(long, env = "MOCKYAML_DEFAULT_ENGINE", default_value = "none")]
    pub default_engine: TemplateEngine,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_parses_defaults() {
        let cli = Cli::parse_from(["mockyaml"]);
        assert_eq!(cli.port, 8080);
        assert_eq!(cli.trace_size, 256);
        assert_eq!(cli.log_level, "info");
        assert_eq!(cli.default_engine, TemplateEngine::None);
    }

    #[test]
    fn default_engine_accepts_named_variants() {
        let cli = Cli::parse_from(["mockyaml", "--default-engine", "jinja2"]);
        assert_eq!(cli.default_engine, TemplateEngine::Jinja2);
        assert_eq!(cli.default_engine.as_str(), "jinja2");
    }

    #[test]
    fn cli_debug_assert() {
        Cli::command().debug_assert();
    }
}
