use std::time::Duration;

use anyhow::Context;
use clap::{Parser, Subcommand};
use dotenv::dotenv;
use serde_json::Value;
use wmill::{ClientConfig, ScriptRef, WaitOptions, Windmill};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Platform base URL (defaults to BASE_INTERNAL_URL)
    #[arg(long, global = true)]
    base_url: Option<String>,

    /// Workspace id (defaults to WM_WORKSPACE)
    #[arg(short, long, global = true)]
    workspace: Option<String>,

    /// Bearer token (defaults to WM_TOKEN)
    #[arg(long, global = true)]
    token: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Read or write a variable
    Variable {
        #[command(subcommand)]
        action: VariableAction,
    },
    /// Read or write a resource
    Resource {
        #[command(subcommand)]
        action: ResourceAction,
    },
    /// Read or write the state of the current script
    State {
        #[command(subcommand)]
        action: StateAction,
    },
    /// Run a script and print its result
    Run {
        /// Script path, or hash with --hash
        script: String,

        #[arg(long)]
        hash: bool,

        /// JSON object of arguments
        #[arg(short, long, default_value = "{}")]
        args: String,

        /// Give up and cancel after this many seconds
        #[arg(short, long)]
        timeout: Option<u64>,

        /// Print the job id instead of waiting for the result
        #[arg(long = "async")]
        no_wait: bool,
    },
    /// Show the identity behind the token
    Whoami,
    /// Show the server version
    Version,
}

#[derive(Subcommand, Debug)]
enum VariableAction {
    Get {
        path: String,
        /// Print the stored string without parsing it
        #[arg(long)]
        raw: bool,
        /// Leave secret values encrypted
        #[arg(long)]
        no_decrypt: bool,
    },
    Set {
        path: String,
        value: String,
        /// Create the variable as a secret
        #[arg(long)]
        secret: bool,
    },
}

#[derive(Subcommand, Debug)]
enum ResourceAction {
    Get {
        path: String,
        /// Skip `$var:`/`$res:` interpolation
        #[arg(long)]
        raw: bool,
    },
    Set {
        path: String,
        /// JSON value
        value: String,
        /// Resource type used when the resource is created
        #[arg(long = "type")]
        resource_type: String,
    },
}

#[derive(Subcommand, Debug)]
enum StateAction {
    Get,
    /// Replace the state with a JSON value
    Set { value: String },
    Clear,
}

fn parse_json(input: &str) -> anyhow::Result<Value> {
    serde_json::from_str(input).with_context(|| format!("invalid JSON: {}", input))
}

fn print_json(value: &Value) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    env_logger::init();

    let args = Args::parse();
    let config = ClientConfig::new(args.token, args.workspace, args.base_url)?;
    let wm = Windmill::with_config(config)?;

    match args.command {
        Commands::Variable { action } => match action {
            VariableAction::Get {
                path,
                raw,
                no_decrypt,
            } => {
                if raw || no_decrypt {
                    println!("{}", wm.get_variable_with(&path, !no_decrypt).await?);
                } else {
                    print_json(&wm.get_variable(&path).await?)?;
                }
            }
            VariableAction::Set {
                path,
                value,
                secret,
            } => {
                wm.set_variable(&path, &value, secret).await?;
                log::info!("variable {} set", path);
            }
        },
        Commands::Resource { action } => match action {
            ResourceAction::Get { path, raw } => {
                let value = if raw {
                    wm.get_resource_raw(&path).await?
                } else {
                    wm.get_resource_any(&path).await?
                };
                print_json(&value)?;
            }
            ResourceAction::Set {
                path,
                value,
                resource_type,
            } => {
                wm.set_resource(&path, Some(parse_json(&value)?), &resource_type)
                    .await?;
                log::info!("resource {} set", path);
            }
        },
        Commands::State { action } => match action {
            StateAction::Get => print_json(&wm.get_state_any().await?.unwrap_or(Value::Null))?,
            StateAction::Set { value } => wm.set_state(Some(parse_json(&value)?)).await?,
            StateAction::Clear => wm.set_state(None).await?,
        },
        Commands::Run {
            script,
            hash,
            args,
            timeout,
            no_wait,
        } => {
            let script = if hash {
                ScriptRef::Hash(script)
            } else {
                ScriptRef::Path(script)
            };
            let script_args = parse_json(&args)?;

            if no_wait {
                println!("{}", wm.run_script_async(&script, script_args, None).await?);
            } else {
                let mut opts = WaitOptions::default();
                if let Some(secs) = timeout {
                    opts = opts.with_timeout(Duration::from_secs(secs));
                }
                print_json(&wm.run_script(&script, script_args, &opts).await?)?;
            }
        }
        Commands::Whoami => print_json(&wm.whoami().await?)?,
        Commands::Version => println!("{}", wm.version().await?),
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_variable_set() {
        let args = Args::try_parse_from([
            "wmill",
            "--workspace",
            "demo",
            "variable",
            "set",
            "u/admin/x",
            "hello",
            "--secret",
        ])
        .unwrap();

        assert_eq!(args.workspace.as_deref(), Some("demo"));
        match args.command {
            Commands::Variable {
                action:
                    VariableAction::Set {
                        path,
                        value,
                        secret,
                    },
            } => {
                assert_eq!(path, "u/admin/x");
                assert_eq!(value, "hello");
                assert!(secret);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_parse_run_defaults() {
        let args = Args::try_parse_from(["wmill", "run", "u/admin/hello"]).unwrap();
        match args.command {
            Commands::Run {
                script,
                hash,
                args,
                timeout,
                no_wait,
            } => {
                assert_eq!(script, "u/admin/hello");
                assert!(!hash);
                assert_eq!(args, "{}");
                assert_eq!(timeout, None);
                assert!(!no_wait);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_resource_set_requires_type() {
        assert!(Args::try_parse_from(["wmill", "resource", "set", "u/a/b", "{}"]).is_err());
    }

    #[test]
    fn test_parse_json_error() {
        assert!(parse_json("{not json").is_err());
        assert_eq!(parse_json("[1]").unwrap(), serde_json::json!([1]));
    }
}
