//! zonectl command line tool
//!
//! Thin command layer over the `zonectl` library: parses arguments, loads
//! input documents, calls the core operations and renders the results.

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::io::{self, IsTerminal};
use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use derive_more::{Display, Error, From};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use zonectl::api::client::HttpDnsApi;
use zonectl::api::{
    ApiError, BulkOperation, BulkRequestHandle, DnsApi, RecordSetFilter, ZoneListFilter,
};
use zonectl::config::{ConfigError, ToolConfig};
use zonectl::dns::bulk::{submit_bulk_create, submit_bulk_delete};
use zonectl::dns::bulk_results::{collect_results, collect_statuses, BulkSummary};
use zonectl::dns::errors::DnsError;
use zonectl::dns::merge::{self, RecordChange};
use zonectl::dns::reconcile::{update_record_sets, ReconcileMode};
use zonectl::dns::recordset::{
    ContractInfo, Recordset, RecordsetList, ZoneCreateSpec, ZoneType,
};
use zonectl::dns::resolver::{delete_matching, PromptConfirm, ResolveFlags, ResolveOutcome};
use zonectl::dns::zoneconfig::{self, ZoneSummary, ZoneUpdate};
use zonectl::dns::find_recordsets;
use zonectl::output::{self, OutputError, OutputFormat, OutputFormatter};

/// Manage remotely hosted DNS zones and recordsets
#[derive(Parser)]
#[command(name = "zonectl")]
#[command(version)]
#[command(about = "DNS zone and recordset management", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Management API endpoint
    #[arg(short = 'H', long, env = "ZONECTL_HOST")]
    host: Option<String>,

    /// API key for authentication
    #[arg(short = 'k', long, env = "ZONECTL_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// TOML configuration file
    #[arg(short, long, env = "ZONECTL_CONFIG")]
    config: Option<PathBuf>,

    /// Output format
    #[arg(short = 'o', long, value_enum, default_value = "table")]
    output: OutputFormat,

    /// Write rendered output to a file instead of stdout
    #[arg(long)]
    out_file: Option<PathBuf>,

    /// Print nothing on success
    #[arg(long)]
    suppress: bool,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,

    /// No color output
    #[arg(long)]
    no_color: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Add a record to a recordset, creating the recordset if needed
    AddRecord {
        zone: String,
        /// Record type
        record_type: String,
        /// Record fields as key=value (e.g. name=www target=192.0.2.1)
        #[arg(required = true, value_parser = parse_field)]
        fields: Vec<(String, String)>,
    },
    /// Remove records or whole recordsets
    RmRecord {
        zone: String,
        record_type: String,
        name: String,
        /// Remove only these RDATA values
        #[arg(long = "target")]
        targets: Vec<String>,
        /// Allow removing the last RDATA value, deleting the recordset
        #[arg(long)]
        delete_empty: bool,
        /// Never prompt
        #[arg(long)]
        non_interactive: bool,
        /// Delete every matching recordset
        #[arg(long)]
        force_multiple: bool,
    },
    /// List recordsets of a zone
    ListRecordsets {
        zone: String,
        /// Only these types
        #[arg(long = "type")]
        types: Vec<String>,
        /// Substring search on name or RDATA
        #[arg(long)]
        search: Option<String>,
    },
    /// Show one recordset
    RetrieveRecordset {
        zone: String,
        name: String,
        record_type: String,
    },
    /// Create one recordset
    CreateRecordset {
        zone: String,
        #[command(flatten)]
        input: RecordsetInput,
    },
    /// Change the TTL and/or RDATA of one recordset
    UpdateRecordset {
        zone: String,
        name: String,
        record_type: String,
        #[arg(long)]
        ttl: Option<u32>,
        /// Replacement RDATA values
        #[arg(long)]
        rdata: Vec<String>,
    },
    /// Delete one recordset
    DeleteRecordset {
        zone: String,
        name: String,
        record_type: String,
    },
    /// Create several recordsets from a JSON file
    CreateRecordsets {
        zone: String,
        /// JSON document {"recordsets": [...]}
        #[arg(long)]
        file: PathBuf,
    },
    /// Apply recordsets from a JSON file to a zone
    UpdateRecordsets {
        zone: String,
        /// JSON document {"recordsets": [...]}
        #[arg(long)]
        file: PathBuf,
        /// Replace the zone's recordsets instead of merging
        #[arg(long)]
        overwrite: bool,
    },
    /// Show zone configuration
    RetrieveZoneconfig { zone: String },
    /// List zones
    ListZoneconfig {
        /// Contract to list (repeatable)
        #[arg(long = "contractid")]
        contract_ids: Vec<String>,
        /// Zone type to list (repeatable)
        #[arg(long = "type", value_parser = parse_zone_type)]
        types: Vec<ZoneType>,
        /// Substring of the zone name
        #[arg(long)]
        search: Option<String>,
        /// Only name, type, activation state and contract
        #[arg(long)]
        summary: bool,
    },
    /// Create a zone
    CreateZoneconfig {
        /// JSON zone specification
        #[arg(long, conflicts_with_all = ["zone", "zone_type"])]
        file: Option<PathBuf>,
        #[arg(long, required_unless_present = "file")]
        zone: Option<String>,
        #[arg(long = "type", value_parser = parse_zone_type, default_value = "PRIMARY")]
        zone_type: ZoneType,
        #[arg(long)]
        contractid: String,
        #[arg(long)]
        groupid: Option<String>,
        /// Add the default SOA and NS recordsets to a new PRIMARY zone
        #[arg(long)]
        initialize: bool,
    },
    /// Change the configuration of a zone
    UpdateZoneconfig {
        /// JSON zone specification replacing the current one
        #[arg(long, conflicts_with_all = ["zone", "changes"])]
        file: Option<PathBuf>,
        #[arg(required_unless_present = "file")]
        zone: Option<String>,
        #[command(flatten)]
        changes: ZoneChanges,
    },
    /// Submit a bulk zone create or delete request
    SubmitBulkzones {
        #[command(flatten)]
        op: BulkOpArgs,
        /// JSON document {"zones": [...]}
        #[arg(long)]
        file: PathBuf,
        #[arg(long, required_if_eq("create", "true"))]
        contractid: Option<String>,
        #[arg(long)]
        groupid: Option<String>,
        /// Skip the service's safety checks on delete
        #[arg(long)]
        bypass_safety_checks: bool,
        /// Where to record the request handles
        #[arg(long)]
        handles_file: Option<PathBuf>,
    },
    /// Show the status of bulk requests
    StatusBulkzones {
        #[command(flatten)]
        op: BulkOpArgs,
        #[command(flatten)]
        ids: RequestIds,
    },
    /// Show the per-zone result of bulk requests
    ResultBulkzones {
        #[command(flatten)]
        op: BulkOpArgs,
        #[command(flatten)]
        ids: RequestIds,
    },
}

#[derive(Args)]
struct RecordsetInput {
    /// JSON recordset
    #[arg(long, conflicts_with_all = ["name", "record_type", "ttl", "rdata"])]
    file: Option<PathBuf>,
    #[arg(long, required_unless_present = "file")]
    name: Option<String>,
    #[arg(long = "type", required_unless_present = "file")]
    record_type: Option<String>,
    #[arg(long, required_unless_present = "file")]
    ttl: Option<u32>,
    #[arg(long, required_unless_present = "file")]
    rdata: Vec<String>,
}

#[derive(Args)]
#[group(id = "changes", multiple = true)]
struct ZoneChanges {
    #[arg(long = "type", value_parser = parse_zone_type)]
    zone_type: Option<ZoneType>,
    #[arg(long)]
    contractid: Option<String>,
    #[arg(long)]
    comment: Option<String>,
    /// Master name server (repeatable)
    #[arg(long = "master")]
    masters: Vec<String>,
    #[arg(long)]
    signandserve: Option<bool>,
    #[arg(long)]
    algorithm: Option<String>,
    /// Target zone of an ALIAS zone
    #[arg(long)]
    target: Option<String>,
    #[arg(long)]
    endcustomerid: Option<String>,
}

impl ZoneChanges {
    fn to_update(&self) -> ZoneUpdate {
        ZoneUpdate {
            zone_type: self.zone_type,
            contract_id: self.contractid.clone(),
            comment: self.comment.clone(),
            masters: if self.masters.is_empty() {
                None
            } else {
                Some(self.masters.clone())
            },
            sign_and_serve: self.signandserve,
            sign_and_serve_algorithm: self.algorithm.clone(),
            target: self.target.clone(),
            end_customer_id: self.endcustomerid.clone(),
        }
    }
}

#[derive(Args)]
#[group(required = true, multiple = false)]
struct BulkOpArgs {
    #[arg(long)]
    create: bool,
    #[arg(long)]
    delete: bool,
}

impl BulkOpArgs {
    fn operation(&self) -> BulkOperation {
        if self.delete {
            BulkOperation::Delete
        } else {
            BulkOperation::Create
        }
    }
}

#[derive(Args)]
#[group(required = true, multiple = true)]
struct RequestIds {
    /// Bulk request ID (repeatable)
    #[arg(long = "requestid")]
    request_ids: Vec<String>,
    /// Handles file written by submit-bulkzones
    #[arg(long)]
    handles_file: Option<PathBuf>,
}

#[derive(Deserialize)]
struct BulkCreateFile {
    zones: Vec<ZoneCreateSpec>,
}

#[derive(Deserialize)]
struct BulkDeleteFile {
    zones: Vec<String>,
}

#[derive(Deserialize)]
struct HandlesFile {
    requests: Vec<BulkRequestHandle>,
}

#[derive(Debug, Display, From, Error)]
enum CliError {
    Dns(DnsError),
    Api(ApiError),
    Config(ConfigError),
    Output(OutputError),
    Io(io::Error),
    Json(serde_json::Error),
}

type Result<T> = std::result::Result<T, CliError>;

fn parse_field(raw: &str) -> std::result::Result<(String, String), String> {
    match raw.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => {
            Ok((key.trim().to_ascii_lowercase(), value.to_string()))
        }
        _ => Err(format!("expected key=value, got '{}'", raw)),
    }
}

fn parse_zone_type(raw: &str) -> std::result::Result<ZoneType, String> {
    match raw.to_ascii_uppercase().as_str() {
        "PRIMARY" => Ok(ZoneType::Primary),
        "SECONDARY" => Ok(ZoneType::Secondary),
        "ALIAS" => Ok(ZoneType::Alias),
        _ => Err(format!("unknown zone type '{}'", raw)),
    }
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let raw = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&raw)?)
}

fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();
}

fn connect(cli: &Cli) -> Result<(HttpDnsApi, ToolConfig)> {
    let mut config = ToolConfig::load(cli.config.as_deref())?;
    if let Some(host) = &cli.host {
        config.host = Some(host.clone());
    }
    if let Some(api_key) = &cli.api_key {
        config.api_key = Some(api_key.clone());
    }

    let host = config.host.clone().ok_or_else(|| ConfigError {
        parameter: "host".to_string(),
        value: String::new(),
        reason: "no management API endpoint configured".to_string(),
        suggestion: "Pass --host, set ZONECTL_HOST or add host to the config file".to_string(),
    })?;

    debug!(
        host = %host,
        timeout_secs = config.timeout_secs,
        retries = config.retry.max_retries,
        batch_size = %config.zones_batch_size,
        "connecting to management API"
    );

    let api = HttpDnsApi::new(
        host,
        config.api_key.clone(),
        Duration::from_secs(config.timeout_secs),
        config.retry.clone(),
    )?;
    Ok((api, config))
}

fn with_progress<T>(formatter: &OutputFormatter, message: &str, f: impl FnOnce() -> T) -> T {
    let pb = formatter.show_progress(message);
    let result = f();
    pb.finish_and_clear();
    result
}

fn report_change(formatter: &OutputFormatter, zone: &str, change: &RecordChange) -> Result<()> {
    match change {
        RecordChange::Created(rs) => {
            formatter.print_success(&format!("Created {} in zone {}", rs.key(), zone));
            formatter.emit(rs)?;
        }
        RecordChange::Updated(rs) => {
            formatter.print_success(&format!("Updated {} in zone {}", rs.key(), zone));
            formatter.emit(rs)?;
        }
        RecordChange::Deleted(key) => {
            formatter.print_success(&format!("Deleted {} from zone {}", key, zone));
        }
        RecordChange::Unchanged(rs) => {
            formatter.print_info(&format!("No changes to {} in zone {}", rs.key(), zone));
        }
    }
    Ok(())
}

fn request_ids(ids: &RequestIds) -> Result<Vec<String>> {
    let mut all = ids.request_ids.clone();
    if let Some(path) = &ids.handles_file {
        let file: HandlesFile = read_json(path)?;
        all.extend(file.requests.into_iter().map(|h| h.request_id));
    }
    Ok(all)
}

fn run(cli: &Cli, formatter: &OutputFormatter) -> Result<()> {
    let (client, config) = connect(cli)?;
    let api: &dyn DnsApi = &client;

    match &cli.command {
        Commands::AddRecord {
            zone,
            record_type,
            fields,
        } => {
            let provided: BTreeMap<String, String> = fields.iter().cloned().collect();
            let incoming = merge::record_from_fields(zone, record_type, &provided)?;
            let change = with_progress(formatter, "Adding record...", || {
                merge::add_record(api, zone, &incoming)
            })?;
            report_change(formatter, zone, &change)?;
        }

        Commands::RmRecord {
            zone,
            record_type,
            name,
            targets,
            delete_empty,
            non_interactive,
            force_multiple,
        } => {
            let key = merge::qualified_key(zone, name, record_type)?;

            if !targets.is_empty() {
                let targets: BTreeSet<String> = targets.iter().cloned().collect();
                let change = with_progress(formatter, "Removing records...", || {
                    merge::remove_record_targets(api, zone, &key, &targets, *delete_empty)
                })?;
                return report_change(formatter, zone, &change);
            }

            let flags = ResolveFlags {
                non_interactive: *non_interactive || !io::stdin().is_terminal(),
                force_multiple: *force_multiple,
            };
            let stdin = io::stdin();
            let mut prompt = PromptConfirm::new(stdin.lock(), io::stderr());

            match delete_matching(api, zone, &key, flags, &mut prompt)? {
                ResolveOutcome::Deleted(deleted) => formatter.print_success(&format!(
                    "Deleted {} recordset(s) for {} from zone {}",
                    deleted.len(),
                    key,
                    zone
                )),
                ResolveOutcome::Aborted => formatter.print_warning("Aborted, nothing was deleted"),
            }
        }

        Commands::ListRecordsets {
            zone,
            types,
            search,
        } => {
            let filter = RecordSetFilter {
                types: types.iter().map(|t| t.to_ascii_uppercase()).collect(),
                search: search.clone(),
            };
            let recordsets = with_progress(formatter, "Fetching recordsets...", || {
                api.get_record_sets(zone, &filter)
            })
            .map_err(|e| DnsError::from_api(zone, None, e))?;
            formatter.emit(&recordsets)?;
        }

        Commands::RetrieveRecordset {
            zone,
            name,
            record_type,
        } => {
            let key = merge::qualified_key(zone, name, record_type)?;
            let found = with_progress(formatter, "Fetching recordset...", || {
                find_recordsets(api, zone, &key)
            })?;
            if found.is_empty() {
                return Err(DnsError::NotFound {
                    zone: zone.clone(),
                    key: Some(key),
                }
                .into());
            }
            formatter.emit(&found)?;
        }

        Commands::CreateRecordset { zone, input } => {
            let recordset = match &input.file {
                Some(path) => read_json::<Recordset>(path)?,
                None => {
                    let key = merge::qualified_key(
                        zone,
                        input.name.as_deref().unwrap_or_default(),
                        input.record_type.as_deref().unwrap_or_default(),
                    )?;
                    Recordset::new(
                        key.name,
                        key.record_type,
                        input.ttl.unwrap_or_default(),
                        input.rdata.clone(),
                    )
                }
            };
            with_progress(formatter, "Creating recordset...", || {
                merge::create_record_set(api, zone, &recordset)
            })?;
            formatter.print_success(&format!("Created {} in zone {}", recordset.key(), zone));
        }

        Commands::UpdateRecordset {
            zone,
            name,
            record_type,
            ttl,
            rdata,
        } => {
            let key = merge::qualified_key(zone, name, record_type)?;
            let rdata = if rdata.is_empty() {
                None
            } else {
                Some(rdata.as_slice())
            };
            let change = with_progress(formatter, "Updating recordset...", || {
                merge::patch_record(api, zone, &key, *ttl, rdata)
            })?;
            report_change(formatter, zone, &change)?;
        }

        Commands::DeleteRecordset {
            zone,
            name,
            record_type,
        } => {
            let key = merge::qualified_key(zone, name, record_type)?;
            with_progress(formatter, "Deleting recordset...", || {
                merge::delete_record_set(api, zone, &key)
            })?;
            formatter.print_success(&format!("Deleted {} from zone {}", key, zone));
        }

        Commands::CreateRecordsets { zone, file } => {
            let list: RecordsetList = read_json(file)?;
            with_progress(formatter, "Creating recordsets...", || {
                merge::create_record_sets(api, zone, &list.recordsets)
            })?;
            formatter.print_success(&format!(
                "Created {} recordsets in zone {}",
                list.recordsets.len(),
                zone
            ));
        }

        Commands::UpdateRecordsets {
            zone,
            file,
            overwrite,
        } => {
            let list: RecordsetList = read_json(file)?;
            let mode = if *overwrite {
                ReconcileMode::Overwrite
            } else {
                ReconcileMode::Merge
            };
            let outcome = with_progress(formatter, "Updating recordsets...", || {
                update_record_sets(api, zone, &list.recordsets, mode)
            })?;

            if !outcome.changed {
                formatter.print_info(&format!("No changes to zone {}", zone));
                return Ok(());
            }
            formatter.print_success(&format!(
                "Submitted {} recordsets to zone {}",
                outcome.recordsets.len(),
                zone
            ));
            if let Some(bump) = outcome.serial_bump {
                formatter.print_info(&format!("SOA serial advanced from {} to {}", bump.old, bump.new));
            }
        }

        Commands::RetrieveZoneconfig { zone } => {
            let info = with_progress(formatter, "Fetching zone...", || api.get_zone(zone))
                .map_err(|e| DnsError::from_api(zone, None, e))?;
            formatter.emit(&info)?;
        }

        Commands::ListZoneconfig {
            contract_ids,
            types,
            search,
            summary,
        } => {
            let filter = ZoneListFilter {
                contract_ids: contract_ids.clone(),
                types: types.clone(),
                search: search.clone(),
            };
            let zones = with_progress(formatter, "Fetching zones...", || {
                zoneconfig::list_zones(api, &filter)
            })?;
            if *summary {
                let rows: Vec<ZoneSummary> = zones.iter().map(ZoneSummary::from).collect();
                formatter.emit(&rows)?;
            } else {
                formatter.emit(&zones)?;
            }
        }

        Commands::CreateZoneconfig {
            file,
            zone,
            zone_type,
            contractid,
            groupid,
            initialize,
        } => {
            let spec = match file {
                Some(path) => read_json::<ZoneCreateSpec>(path)?,
                None => ZoneCreateSpec::new(zone.clone().unwrap_or_default(), *zone_type),
            };
            let mut contract = ContractInfo::new(contractid.clone());
            contract.group_id = groupid.clone();

            let info = with_progress(formatter, "Creating zone...", || {
                zoneconfig::create_zone(api, &spec, &contract, *initialize)
            })?;
            formatter.print_success(&format!("Created zone {}", info.zone));
            formatter.emit(&info)?;
        }

        Commands::UpdateZoneconfig {
            file,
            zone,
            changes,
        } => {
            let change = match file {
                Some(path) => {
                    let spec = read_json::<ZoneCreateSpec>(path)?;
                    with_progress(formatter, "Updating zone...", || {
                        zoneconfig::replace_zone(api, spec)
                    })?
                }
                None => {
                    let zone = zone.clone().unwrap_or_default();
                    let update = changes.to_update();
                    with_progress(formatter, "Updating zone...", || {
                        zoneconfig::update_zone(api, &zone, &update)
                    })?
                }
            };
            if change.changed {
                formatter.print_success(&format!("Updated zone {}", change.zone.zone));
            } else {
                formatter.print_info(&format!("No changes to zone {}", change.zone.zone));
            }
            formatter.emit(&change.zone)?;
        }

        Commands::SubmitBulkzones {
            op,
            file,
            contractid,
            groupid,
            bypass_safety_checks,
            handles_file,
        } => {
            let handles_path = handles_file.clone().unwrap_or_else(output::default_handles_path);

            match op.operation() {
                BulkOperation::Create => {
                    let input: BulkCreateFile = read_json(file)?;
                    let mut contract = ContractInfo::new(contractid.clone().unwrap_or_default());
                    contract.group_id = groupid.clone();
                    let submitted = with_progress(formatter, "Submitting bulk create...", || {
                        submit_bulk_create(api, &input.zones, &contract, config.zones_batch_size)
                    });

                    match submitted {
                        Ok(handles) if handles.is_empty() => {
                            formatter.print_info("No zones to submit");
                        }
                        Ok(handles) => {
                            output::write_handles(&handles_path, &handles)?;
                            formatter.print_success(&format!(
                                "Submitted {} zones in {} request(s); handles written to {}",
                                input.zones.len(),
                                handles.len(),
                                handles_path.display()
                            ));
                            formatter.emit(&handles)?;
                        }
                        Err(err) => {
                            if let DnsError::Submission { handles, .. } = &err {
                                if !handles.is_empty() {
                                    output::write_handles(&handles_path, handles)?;
                                    formatter.print_warning(&format!(
                                        "{} batch(es) were accepted before the failure; handles written to {}",
                                        handles.len(),
                                        handles_path.display()
                                    ));
                                }
                            }
                            return Err(err.into());
                        }
                    }
                }
                BulkOperation::Delete => {
                    let input: BulkDeleteFile = read_json(file)?;
                    let submitted = with_progress(formatter, "Submitting bulk delete...", || {
                        submit_bulk_delete(api, &input.zones, *bypass_safety_checks)
                    })?;

                    match submitted {
                        Some(handle) => {
                            let handles = vec![handle];
                            output::write_handles(&handles_path, &handles)?;
                            formatter.print_success(&format!(
                                "Submitted delete of {} zones; handle written to {}",
                                input.zones.len(),
                                handles_path.display()
                            ));
                            formatter.emit(&handles)?;
                        }
                        None => formatter.print_info("No zones to delete"),
                    }
                }
            }
        }

        Commands::StatusBulkzones { op, ids } => {
            let ids = request_ids(ids)?;
            let entries = with_progress(formatter, "Fetching bulk status...", || {
                collect_statuses(api, op.operation(), &ids)
            });
            formatter.emit(&output::status_rows(&entries))?;

            let summary = BulkSummary::from_statuses(&entries);
            if summary.unavailable > 0 {
                formatter.print_warning(&format!(
                    "{} of {} request(s) could not be fetched",
                    summary.unavailable, summary.requests
                ));
            }
        }

        Commands::ResultBulkzones { op, ids } => {
            let ids = request_ids(ids)?;
            let entries = with_progress(formatter, "Fetching bulk results...", || {
                collect_results(api, op.operation(), &ids)
            });
            formatter.emit(&output::result_rows(&entries))?;

            let summary = BulkSummary::from_results(&entries);
            formatter.print_info(&format!(
                "{} succeeded, {} failed across {} request(s)",
                summary.succeeded, summary.failed, summary.requests
            ));
            if summary.unavailable > 0 {
                formatter.print_warning(&format!(
                    "{} of {} request(s) could not be fetched",
                    summary.unavailable, summary.requests
                ));
            }
        }
    }

    Ok(())
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let formatter = OutputFormatter::new(cli.output, cli.no_color, cli.suppress, cli.out_file.clone());

    if let Err(e) = run(&cli, &formatter) {
        formatter.print_error(&e.to_string());
        std::process::exit(1);
    }
}
