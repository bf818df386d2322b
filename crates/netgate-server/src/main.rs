use anyhow::{Context, Result};
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use netgate_server::{
    bootstrap, logging, schemas, serve_lines, LogFormat, NetgateConfig, ToolCall, ToolResponse,
    ToolStatus,
};
use serde_json::{json, Value};
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

fn file_arg() -> Arg {
    Arg::new("file")
        .required(true)
        .value_parser(value_parser!(PathBuf))
        .help("Configuration file, or - for stdin")
}

fn device_arg() -> Arg {
    Arg::new("device").required(true).help("Device hostname")
}

fn cli() -> Command {
    Command::new("netgate")
        .version(netgate_server::VERSION)
        .about("Verified network configuration deployment")
        .subcommand_required(true)
        .arg(
            Arg::new("config")
                .long("config")
                .global(true)
                .env("NETGATE_CONFIG")
                .value_parser(value_parser!(PathBuf))
                .help("Config file (default: netgate.toml if present)"),
        )
        .arg(
            Arg::new("log-format")
                .long("log-format")
                .global(true)
                .value_parser(value_parser!(LogFormat))
                .help("Log format: text or json"),
        )
        .arg(
            Arg::new("json")
                .long("json")
                .global(true)
                .action(ArgAction::SetTrue)
                .help("Print the full tool response as JSON"),
        )
        .subcommand(Command::new("serve").about("Serve JSON-lines tool calls on stdin/stdout"))
        .subcommand(
            Command::new("validate")
                .about("Check a host configuration")
                .arg(file_arg())
                .arg(
                    Arg::new("dialect")
                        .long("dialect")
                        .default_value("netplan")
                        .help("netplan or interfaces"),
                ),
        )
        .subcommand(
            Command::new("verify")
                .about("Statically analyse a device configuration")
                .arg(file_arg())
                .arg(Arg::new("hostname").long("hostname").required(true).help("Device hostname"))
                .arg(
                    Arg::new("platform")
                        .long("platform")
                        .required(true)
                        .help("cisco_ios, junos or arista_eos"),
                ),
        )
        .subcommand(
            Command::new("diff")
                .about("Diff a candidate against a device's current configuration")
                .arg(device_arg())
                .arg(file_arg()),
        )
        .subcommand(
            Command::new("deploy")
                .about("Deploy a candidate (dry run unless --apply)")
                .arg(device_arg())
                .arg(file_arg())
                .arg(
                    Arg::new("apply")
                        .long("apply")
                        .action(ArgAction::SetTrue)
                        .help("Push the candidate instead of previewing it"),
                )
                .arg(
                    Arg::new("no-auto-rollback")
                        .long("no-auto-rollback")
                        .action(ArgAction::SetTrue)
                        .help("Commit without a health check"),
                ),
        )
        .subcommand(
            Command::new("rollback")
                .about("Restore the backup of a committed deployment")
                .arg(device_arg())
                .arg(
                    Arg::new("revision")
                        .long("revision")
                        .default_value("last")
                        .help("last or a deployment id"),
                ),
        )
        .subcommand(
            Command::new("audit")
                .about("Check a configuration against a compliance ruleset")
                .arg(file_arg())
                .arg(
                    Arg::new("ruleset")
                        .long("ruleset")
                        .default_value("golden")
                        .help("Ruleset name"),
                ),
        )
        .subcommand(
            Command::new("scan")
                .about("Look up advisories for an OS version")
                .arg(Arg::new("version").required(true).help("Exact version tag")),
        )
        .subcommand(
            Command::new("show")
                .about("Show a deployment record")
                .arg(Arg::new("id").required(true).help("Deployment id")),
        )
        .subcommand(
            Command::new("history")
                .about("List a device's deployment records")
                .arg(device_arg()),
        )
        .subcommand(Command::new("devices").about("List registered devices"))
        .subcommand(
            Command::new("clear-degraded")
                .about("Clear a device's degraded marker after manual repair")
                .arg(device_arg()),
        )
        .subcommand(
            Command::new("plan")
                .about("Print the safe deployment workflow for a device")
                .arg(device_arg()),
        )
        .subcommand(Command::new("recover").about("Resolve deployments interrupted by a crash"))
        .subcommand(Command::new("schema").about("Print the request schema of every tool"))
}

fn read_content(args: &ArgMatches) -> Result<String> {
    let path = args
        .get_one::<PathBuf>("file")
        .context("missing configuration file")?;
    if path == Path::new("-") {
        let mut text = String::new();
        std::io::stdin()
            .read_to_string(&mut text)
            .context("reading configuration from stdin")?;
        return Ok(text);
    }
    std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))
}

fn string(args: &ArgMatches, name: &str) -> String {
    args.get_one::<String>(name).cloned().unwrap_or_default()
}

/// Tool call for a tool subcommand
fn tool_call(name: &str, args: &ArgMatches) -> Result<ToolCall> {
    let (tool, arguments) = match name {
        "validate" => (
            "validate_host_config",
            json!({ "content": read_content(args)?, "dialect": string(args, "dialect") }),
        ),
        "verify" => (
            "verify_device_config",
            json!({
                "content": read_content(args)?,
                "hostname": string(args, "hostname"),
                "platform": string(args, "platform"),
            }),
        ),
        "diff" => (
            "get_config_diff",
            json!({ "device": string(args, "device"), "candidate": read_content(args)? }),
        ),
        "deploy" => (
            "deploy_config",
            json!({
                "device": string(args, "device"),
                "candidate": read_content(args)?,
                "dry_run": !args.get_flag("apply"),
                "auto_rollback": !args.get_flag("no-auto-rollback"),
            }),
        ),
        "rollback" => (
            "rollback",
            json!({ "device": string(args, "device"), "revision": string(args, "revision") }),
        ),
        "audit" => (
            "check_compliance",
            json!({ "content": read_content(args)?, "ruleset": string(args, "ruleset") }),
        ),
        "scan" => ("scan_vulnerabilities", json!({ "version": string(args, "version") })),
        "show" => ("get_deployment", json!({ "id": string(args, "id") })),
        "history" => ("device_history", json!({ "device": string(args, "device") })),
        "devices" => ("list_devices", json!({})),
        "clear-degraded" => ("clear_degraded", json!({ "device": string(args, "device") })),
        "plan" => ("plan_deployment", json!({ "device": string(args, "device") })),
        other => anyhow::bail!("unknown command '{other}'"),
    };
    Ok(ToolCall {
        tool: tool.to_string(),
        arguments,
    })
}

fn print_response(response: &ToolResponse, as_json: bool) -> Result<()> {
    if as_json {
        println!("{}", serde_json::to_string_pretty(response)?);
        return Ok(());
    }
    println!("{}", response.message);
    if let Some(Value::Object(data)) = &response.data {
        if let Some(Value::String(unified)) = data.get("unified") {
            if !unified.is_empty() {
                println!("{unified}");
            }
        }
    }
    Ok(())
}

async fn run(matches: &ArgMatches) -> Result<ExitCode> {
    let Some((name, args)) = matches.subcommand() else {
        return Ok(ExitCode::from(ToolStatus::Failed.exit_code()));
    };
    if name == "schema" {
        println!("{}", serde_json::to_string_pretty(&schemas())?);
        return Ok(ExitCode::SUCCESS);
    }

    let mut config = NetgateConfig::load(args.get_one::<PathBuf>("config").map(PathBuf::as_path))?;
    if let Some(format) = args.get_one::<LogFormat>("log-format") {
        config.log_format = *format;
    }
    logging::init(config.log_format).map_err(|e| anyhow::anyhow!("logging: {e}"))?;

    let server = bootstrap(&config).context("starting netgate")?;
    match name {
        "serve" => {
            let stdin = tokio::io::BufReader::new(tokio::io::stdin());
            serve_lines(&server.service, stdin, tokio::io::stdout()).await?;
            Ok(ExitCode::SUCCESS)
        }
        "recover" => {
            println!("{}", serde_json::to_string_pretty(&server.recovery)?);
            Ok(ExitCode::SUCCESS)
        }
        _ => {
            let call = tool_call(name, args)?;
            let response = server.service.dispatch(call).await;
            print_response(&response, args.get_flag("json"))?;
            Ok(ExitCode::from(response.status.exit_code()))
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    match run(&cli().get_matches()).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::from(ToolStatus::Failed.exit_code())
        }
    }
}
