use color_eyre::eyre::{WrapErr, eyre};
use oneclick_wsse::{Client, FieldMapping, Operation, RequestContext, config::Config, telemetry};

/// Usage: `oneclick-wsse <operation> [field=value]...`
#[tokio::main]
async fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;
    telemetry::init_tracing();

    let mut args = std::env::args().skip(1);
    let operation: Operation = args
        .next()
        .ok_or_else(|| eyre!("Usage: oneclick-wsse <operation> [field=value]..."))?
        .parse()?;

    let fields = args
        .map(|arg| {
            arg.split_once('=')
                .map(|(key, value)| (key.to_owned(), value.to_owned()))
                .ok_or_else(|| eyre!("Expected field=value, got '{arg}'"))
        })
        .collect::<color_eyre::Result<FieldMapping>>()?;

    let config = Config::load().wrap_err("Failed to load configuration")?;
    tracing::info!(endpoint = %config.gateway.endpoint, "Loaded configuration");

    let client = Client::from_config(&config)?;
    let request = match fields.get("username") {
        Some(username) => RequestContext::new().with_username(username.as_str()),
        None => RequestContext::new(),
    };
    let outcome = client.call(operation, &fields, &request).await?;

    println!("success: {}", outcome.success);
    println!("message: {}", outcome.message);
    for (key, value) in &outcome.fields {
        println!("{key}: {value}");
    }
    Ok(())
}
