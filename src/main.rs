use std::env;
use std::process::ExitCode;

use aegis_gate::{Gate, GateConfig, RequestFacts, Verdict};
use tracing_subscriber::{fmt, EnvFilter};

/// One-shot check tool: sends a synthetic request to the configured decision
/// service and prints the verdict. Usage: `aegis-gate [METHOD] [URL] [ADDR]`.
#[tokio::main]
async fn main() -> ExitCode {
    // Initialise structured logging. Reads RUST_LOG environment variable.
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt().with_env_filter(filter).init();

    let mut args = env::args().skip(1);
    let method = args.next().unwrap_or_else(|| "GET".to_string());
    let url = args.next().unwrap_or_else(|| "/".to_string());
    let client_address = args.next().unwrap_or_else(|| "127.0.0.1".to_string());

    let config = match GateConfig::from_env() {
        Ok(mut config) => {
            // invoking the tool is the enable switch
            config.enabled = true;
            config
        }
        Err(e) => {
            eprintln!("configuration error: {e:#}");
            return ExitCode::from(2);
        }
    };
    tracing::info!(endpoint = %config.endpoint, timeout_ms = config.timeout_ms, "sending check");

    let gate = Gate::new(config);
    let facts = RequestFacts {
        client_address,
        url,
        method,
        ..RequestFacts::default()
    };

    match gate.check(&facts).await {
        Verdict::Allow => {
            println!("allow");
            ExitCode::SUCCESS
        }
        Verdict::Block(response) => {
            println!("block {}", response.status);
            for (name, value) in response.headers() {
                println!("{name}: {value}");
            }
            if !response.body.is_empty() {
                println!();
                println!("{}", String::from_utf8_lossy(&response.body));
            }
            ExitCode::FAILURE
        }
    }
}
