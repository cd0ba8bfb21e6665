//! Shell completion generation for sqlnav
//!
//! This module provides functionality to generate shell completion scripts
//! for bash, zsh and fish, with dynamic completion of data source names for
//! the `DSN` argument.

use std::io::Write;

use clap::CommandFactory;
use clap_complete::{Shell, generate};

use crate::cli::CliArgs;
use crate::error::{ConfigError, Result, SqlnavError};

const BIN_NAME: &str = "sqlnav";

/// Write the completion script for `shell_name` to `out`
///
/// # Arguments
/// * `shell_name` - Shell type (bash, zsh, fish)
/// * `out` - Destination of the script
pub fn generate_completion<W: Write>(shell_name: &str, out: &mut W) -> Result<()> {
    let shell = parse_shell(shell_name)?;

    let mut cmd = CliArgs::command();
    let mut buffer = Vec::new();
    generate(shell, &mut cmd, BIN_NAME, &mut buffer);
    let basic_completion = String::from_utf8_lossy(&buffer);

    let extra = match shell {
        Shell::Bash => BASH_SOURCES,
        Shell::Zsh => ZSH_SOURCES,
        _ => FISH_SOURCES,
    };
    write!(out, "{basic_completion}\n{extra}")?;
    Ok(())
}

/// Parse shell name string to Shell enum
fn parse_shell(shell_name: &str) -> Result<Shell> {
    match shell_name.to_lowercase().as_str() {
        "bash" => Ok(Shell::Bash),
        "zsh" => Ok(Shell::Zsh),
        "fish" => Ok(Shell::Fish),
        _ => Err(SqlnavError::Config(ConfigError::Generic(format!(
            "Unsupported shell: {shell_name}. Supported shells: bash, zsh, fish"
        )))),
    }
}

const BASH_SOURCES: &str = r#"
# Data source names for the DSN argument
_sqlnav_list_sources() {
    sqlnav sources --names 2>/dev/null
}

_sqlnav_enhanced() {
    local cur prev words cword
    _init_completion || return

    # First word that is neither an option nor a subcommand
    if [[ "$cword" -eq 1 && "$cur" != -* ]]; then
        local sources=$(_sqlnav_list_sources)
        COMPREPLY=($(compgen -W "$sources version completion config sources" -- "$cur"))
        return 0
    fi

    _sqlnav "$@"
}

complete -F _sqlnav_enhanced sqlnav
"#;

const ZSH_SOURCES: &str = r#"
# Data source names for the DSN argument
_sqlnav_sources() {
    local -a sources
    sources=($(sqlnav sources --names 2>/dev/null))
    _describe 'data sources' sources
}

_sqlnav_enhanced() {
    if [[ $CURRENT -eq 2 && ${words[CURRENT]} != -* ]]; then
        _sqlnav_sources
    fi
    _sqlnav "$@"
}

compdef _sqlnav_enhanced sqlnav
"#;

const FISH_SOURCES: &str = r#"
# Data source names for the DSN argument
function __sqlnav_list_sources
    sqlnav sources --names 2>/dev/null
end

complete -c sqlnav -n "__fish_use_subcommand" -f -a "(__sqlnav_list_sources)" -d "Data source"
"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_shell() {
        assert!(matches!(parse_shell("bash"), Ok(Shell::Bash)));
        assert!(matches!(parse_shell("zsh"), Ok(Shell::Zsh)));
        assert!(matches!(parse_shell("fish"), Ok(Shell::Fish)));
        assert!(parse_shell("invalid").is_err());
    }

    #[test]
    fn test_parse_shell_case_insensitive() {
        assert!(matches!(parse_shell("BASH"), Ok(Shell::Bash)));
        assert!(matches!(parse_shell("FiSh"), Ok(Shell::Fish)));
    }

    #[test]
    fn test_script_lists_sources() {
        let mut out = Vec::new();
        generate_completion("fish", &mut out).unwrap();
        let script = String::from_utf8(out).unwrap();
        assert!(script.contains("complete -c sqlnav"));
        assert!(script.contains("sqlnav sources --names"));
    }
}
