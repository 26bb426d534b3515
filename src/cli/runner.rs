//! CLI runner - executes commands

use crate::cli::commands::{Cli, Commands, OutputFormat, Variant};
use crate::client::CrmClient;
use crate::config::ClientConfig;
use crate::error::{Error, Result};
use crate::pagination::{ListRequest, VariantHints};
use crate::query::{Filter, Order, Select};
use crate::types::Params;
use serde_json::{json, Value};
use std::time::Instant;
use tracing::{debug, info};

/// Arguments of the `list` command
#[derive(Debug, Default)]
struct ListArgs<'a> {
    method: &'a str,
    order: Option<&'a str>,
    filter: Option<&'a str>,
    select: Option<&'a str>,
    params: Option<&'a str>,
    limit: Option<usize>,
    variant: Option<Variant>,
    key_field: Option<&'a str>,
    no_reverse_probe: bool,
}

/// CLI runner
pub struct Runner {
    cli: Cli,
}

impl Runner {
    /// Create a new runner
    pub fn new(cli: Cli) -> Self {
        Self { cli }
    }

    /// Run the CLI command
    pub async fn run(&self) -> Result<()> {
        match &self.cli.command {
            Commands::List {
                method,
                order,
                filter,
                select,
                params,
                limit,
                variant,
                key_field,
                no_reverse_probe,
                parallel,
            } => {
                let args = ListArgs {
                    method,
                    order: order.as_deref(),
                    filter: filter.as_deref(),
                    select: select.as_deref(),
                    params: params.as_deref(),
                    limit: *limit,
                    variant: *variant,
                    key_field: key_field.as_deref(),
                    no_reverse_probe: *no_reverse_probe,
                };
                self.list(&args, *parallel).await
            }
            Commands::Call { method, params } => self.call(method, params.as_deref()).await,
        }
    }

    /// Load client configuration
    fn load_config(&self) -> Result<ClientConfig> {
        let mut config = match (&self.cli.config, &self.cli.webhook_url) {
            (Some(path), _) => ClientConfig::from_file(path)?,
            (None, Some(url)) => ClientConfig::new(url.clone()),
            (None, None) => {
                return Err(Error::config(
                    "No portal configured (use --config or --webhook-url)",
                ))
            }
        };

        if let Some(url) = &self.cli.webhook_url {
            config.webhook_url.clone_from(url);
        }
        config.validate()?;
        Ok(config)
    }

    /// Traverse a list method
    async fn list(&self, args: &ListArgs<'_>, parallel: bool) -> Result<()> {
        let request = build_request(args)?;
        let client = CrmClient::new(&self.load_config()?)?.with_parallel_hint(parallel);
        let started = Instant::now();

        let mut traversal = client.list(request)?;
        while let Some(record) = traversal.next().await {
            self.output_message(&record?);
        }

        let stats = traversal.stats();
        info!(
            "{}: {} records in {:?} ({} commands, {} grouped calls)",
            args.method,
            stats.emitted,
            started.elapsed(),
            stats.commands,
            stats.grouped_calls
        );
        debug!("{stats:?}");
        Ok(())
    }

    /// Call a single method
    async fn call(&self, method: &str, params: Option<&str>) -> Result<()> {
        let params = parse_params(params)?;
        let client = CrmClient::new(&self.load_config()?)?;
        let response = client.call(method, &params).await?;

        let mut message = json!({ "result": response.result });
        if let Some(total) = response.pagination.total {
            message["total"] = json!(total);
        }
        if let Some(next) = response.pagination.next {
            message["next"] = json!(next);
        }
        self.output_message(&message);
        Ok(())
    }

    /// Output a message
    fn output_message(&self, msg: &Value) {
        match self.cli.format {
            OutputFormat::Json => {
                println!("{}", serde_json::to_string(msg).unwrap_or_default());
            }
            OutputFormat::Pretty => {
                println!("{}", serde_json::to_string_pretty(msg).unwrap_or_default());
            }
        }
    }
}

/// Build a list request from command-line arguments
fn build_request(args: &ListArgs<'_>) -> Result<ListRequest> {
    let mut hints = match args.variant {
        Some(Variant::Flat) => VariantHints::flat(),
        Some(Variant::Items) => VariantHints::items(),
        None => VariantHints::for_method(args.method),
    };
    if let Some(field) = args.key_field {
        hints = hints.with_key_field(field);
    }
    if args.no_reverse_probe {
        hints = hints.without_reverse_probe();
    }

    let mut request = ListRequest::new(args.method).hints(hints);
    if let Some(order) = args.order {
        request = request.order(Order::from_value(&parse_json("order", order)?)?);
    }
    if let Some(filter) = args.filter {
        request = request.filter(Filter::from_value(&parse_json("filter", filter)?)?);
    }
    if let Some(select) = args.select {
        request = request.select(Select::fields(
            select.split(',').map(str::trim).filter(|f| !f.is_empty()),
        ));
    }
    if let Some(limit) = args.limit {
        request = request.limit(limit);
    }
    request.params = parse_params(args.params)?;
    Ok(request)
}

fn parse_json(what: &str, raw: &str) -> Result<Value> {
    serde_json::from_str(raw).map_err(|e| Error::config(format!("Invalid {what} JSON: {e}")))
}

fn parse_params(raw: Option<&str>) -> Result<Params> {
    match raw {
        None => Ok(Params::new()),
        Some(raw) => match parse_json("params", raw)? {
            Value::Object(map) => Ok(map),
            _ => Err(Error::config("params must be a JSON object")),
        },
    }
}
