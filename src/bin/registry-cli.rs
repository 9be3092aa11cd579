use clap::{Parser, Subcommand};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use serde_json::{json, Value};

#[derive(Parser)]
#[command(name = "registry-cli")]
#[command(about = "Management CLI for the regional registration service", long_about = None)]
struct Cli {
    /// Public service URL.
    #[arg(short, long, default_value = "http://localhost:3000")]
    url: String,

    /// Admin API URL.
    #[arg(short, long, default_value = "http://localhost:3001")]
    admin_url: String,

    #[arg(short, long, env = "REGISTRY_ADMIN_KEY", default_value = "CHANGE_ME_IN_PRODUCTION")]
    key: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check service status
    Status,
    /// Show per-region counters and stored record counts
    Counters,
    /// List the region labels the form accepts
    Regions,
    /// Submit a registration form
    Submit {
        #[arg(long)]
        name: String,
        #[arg(long)]
        phone: String,
        #[arg(long)]
        email: String,
        /// Region label, exactly as listed by `regions`
        #[arg(long)]
        region: String,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();

    let mut headers = HeaderMap::new();
    headers.insert(
        AUTHORIZATION,
        HeaderValue::from_str(&format!("Bearer {}", cli.key))?,
    );

    let res = match cli.command {
        Commands::Status => {
            client.get(format!("{}/admin/status", cli.admin_url))
                .headers(headers)
                .send()
                .await?
        }
        Commands::Counters => {
            client.get(format!("{}/admin/counters", cli.admin_url))
                .headers(headers)
                .send()
                .await?
        }
        Commands::Regions => {
            client.get(format!("{}/regions", cli.url))
                .send()
                .await?
        }
        Commands::Submit { name, phone, email, region } => {
            client.post(format!("{}/save", cli.url))
                .json(&json!({
                    "name": name,
                    "phone": phone,
                    "email": email,
                    "region": region,
                }))
                .send()
                .await?
        }
    };

    print_response(res).await
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    if !status.is_success() {
        eprintln!("Error: service returned status {}", status);
        if let Ok(text) = res.text().await {
            eprintln!("Response: {}", text);
        }
        return Ok(());
    }

    let json: Value = res.json().await?;
    println!("{}", serde_json::to_string_pretty(&json)?);
    Ok(())
}
