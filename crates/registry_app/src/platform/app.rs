use std::fs;
use std::path::Path;
use std::sync::Arc;

use anyhow::{anyhow, bail, Context, Result};
use bytes::Bytes;
use registry_core::session::{self, SessionUser};
use registry_core::{
    validate_name, DraftSlot, EntityKind, KeyValueStore, ListPageState, ListQuery, Msg,
    NormalizedRecord, Severity, SortKey, NAME_MAX_LEN, NAME_MIN_LEN,
};
use registry_engine::{
    EngineHandle, FetchError, ImageUploader, ReqwestTransport, ResourceClient, Transport,
};
use registry_logging::{registry_info, registry_warn};
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use super::config::RegistryConfig;
use super::effects::{Alert, EffectRunner};
use super::persistence::FileStore;
use super::render::{render_alert, render_list};
use crate::cli::{Cli, Command};

enum AddOutcome {
    Created,
    Duplicate(NormalizedRecord),
}

#[derive(Debug, PartialEq, Eq)]
enum EditOutcome {
    /// No new name given; the current record.
    Shown(NormalizedRecord),
    Renamed { from: String },
    Duplicate(NormalizedRecord),
    Missing,
}

/// Add-form fields kept between attempts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
struct NameDraft {
    name: String,
}

pub fn run(cli: Cli) -> Result<()> {
    let config = RegistryConfig::load(&cli.config)?;
    let store = FileStore::open(config.storage_path.clone())
        .with_context(|| format!("opening store {:?}", config.storage_path))?;

    let route = cli.command.route();
    if !session::route_allowed(&route, &store) {
        registry_warn!("Blocked {} without a session", route);
        bail!("Not signed in. Run `registry login` first.");
    }

    match cli.command {
        Command::List {
            resource,
            page,
            page_size,
            search,
            sort,
            desc,
        } => {
            let query = ListQuery::new(page, page_size.unwrap_or(config.page_size));
            let state = ListPageState::starting_at(resource, query);
            let mut msgs = vec![Msg::Mounted];
            if let Some(text) = search {
                msgs.push(Msg::SearchChanged(text));
            }
            msgs.extend(sort_msgs(&state, sort.into(), desc));
            show_page(&config, state, msgs)
        }
        Command::Delete { resource, id, yes } => {
            if !yes {
                bail!("Deleting {resource} {id} cannot be undone; re-run with --yes to confirm.");
            }
            let state = ListPageState::with_page_size(resource, config.page_size);
            show_page(&config, state, [Msg::Mounted, Msg::DeleteConfirmed { id }])
        }
        Command::Add { resource, name } => add_record(&config, &store, resource, name),
        Command::Edit { resource, id, name } => edit_record(&config, resource, &id, name),
        Command::Upload { file } => upload_image(&config, &file),
        Command::Login { email, name, token } => {
            if token.trim().is_empty() {
                bail!("The token must not be empty.");
            }
            session::sign_in(&store, token.trim(), &SessionUser { email, name });
            registry_info!("Signed in");
            println!("Signed in.");
            Ok(())
        }
        Command::Logout => {
            session::logout(&store);
            println!("Signed out.");
            Ok(())
        }
        Command::Whoami => {
            match session::current_user(&store) {
                Some(user) => println!("{} <{}>", user.name, user.email),
                None => println!("Signed in without a stored user."),
            }
            Ok(())
        }
    }
}

/// Messages that leave the page sorted by `key` in the requested direction.
fn sort_msgs(state: &ListPageState, key: SortKey, desc: bool) -> Vec<Msg> {
    let (current, _) = state.sort();
    let mut msgs = Vec::new();
    if current != key {
        msgs.push(Msg::SortClicked(key));
    }
    if desc {
        msgs.push(Msg::SortClicked(key));
    }
    msgs
}

fn show_page(
    config: &RegistryConfig,
    state: ListPageState,
    msgs: impl IntoIterator<Item = Msg>,
) -> Result<()> {
    let engine = EngineHandle::new(config.engine_config()?)?;
    let mut runner = EffectRunner::new(engine);
    let (state, alerts) = runner.settle(state, msgs);

    for alert in &alerts {
        println!("{}", render_alert(alert));
    }
    print!("{}", render_list(&state.view()));

    if alerts.iter().any(|alert| alert.severity == Severity::Error) {
        bail!("the last action failed");
    }
    Ok(())
}

fn add_record(
    config: &RegistryConfig,
    store: &dyn KeyValueStore,
    kind: EntityKind,
    name: Option<String>,
) -> Result<()> {
    let slot = DraftSlot::for_entity(kind);
    let draft = match name {
        Some(name) => NameDraft { name },
        None => slot
            .load::<NameDraft>(store)
            .ok_or_else(|| anyhow!("No saved {} draft; pass a name.", kind.label()))?,
    };
    slot.save(store, &draft);

    let name = validate_name(&draft.name).ok_or_else(|| {
        anyhow!("Name must be between {NAME_MIN_LEN} and {NAME_MAX_LEN} characters.")
    })?;

    let client = resource_client(config, kind)?;
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    let outcome = runtime.block_on(create_unique(&client, name, &CancellationToken::new()));

    match outcome {
        Ok(AddOutcome::Created) => {
            slot.clear(store);
            println!(
                "{}",
                render_alert(&Alert {
                    severity: Severity::Success,
                    text: format!("\"{name}\" has been added to {}.", kind.label()),
                })
            );
            Ok(())
        }
        Ok(AddOutcome::Duplicate(existing)) => bail!(
            "A record named \"{}\" already exists (id {}).",
            existing.name(),
            existing.id
        ),
        Err(err) => Err(anyhow!(err).context(format!("Failed to add {}", kind.label()))),
    }
}

async fn create_unique(
    client: &ResourceClient,
    name: &str,
    cancel: &CancellationToken,
) -> Result<AddOutcome, FetchError> {
    match client.find_duplicate(name, cancel).await? {
        Some(existing) => Ok(AddOutcome::Duplicate(existing)),
        None => client
            .create_with_payload_variants(name, cancel)
            .await
            .map(|_| AddOutcome::Created),
    }
}

fn edit_record(
    config: &RegistryConfig,
    kind: EntityKind,
    id: &str,
    name: Option<String>,
) -> Result<()> {
    let new_name = match &name {
        Some(name) => Some(validate_name(name).ok_or_else(|| {
            anyhow!("Name must be between {NAME_MIN_LEN} and {NAME_MAX_LEN} characters.")
        })?),
        None => None,
    };

    let client = resource_client(config, kind)?;
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    let outcome = runtime
        .block_on(rename(&client, id, new_name, &CancellationToken::new()))
        .with_context(|| format!("Failed to update {} {id}", kind.label()))?;

    match outcome {
        EditOutcome::Shown(record) => {
            println!("{}  {}", record.id, record.name());
            for (field, value) in record.fields.iter().filter(|(field, _)| field.as_str() != "name") {
                if !value.is_empty() {
                    println!("  {field}: {value}");
                }
            }
            Ok(())
        }
        EditOutcome::Renamed { from } => {
            println!(
                "{}",
                render_alert(&Alert {
                    severity: Severity::Success,
                    text: format!(
                        "\"{from}\" has been renamed to \"{}\".",
                        new_name.unwrap_or_default()
                    ),
                })
            );
            Ok(())
        }
        EditOutcome::Duplicate(existing) => bail!(
            "A record named \"{}\" already exists (id {}).",
            existing.name(),
            existing.id
        ),
        EditOutcome::Missing => bail!("{} {id} could not be read.", kind.label()),
    }
}

/// Loads record `id`; with a new name, checks it is unused elsewhere and PUTs it.
async fn rename(
    client: &ResourceClient,
    id: &str,
    new_name: Option<&str>,
    cancel: &CancellationToken,
) -> Result<EditOutcome, FetchError> {
    let Some(current) = client.get_normalized(id, cancel).await? else {
        return Ok(EditOutcome::Missing);
    };
    let Some(new_name) = new_name else {
        return Ok(EditOutcome::Shown(current));
    };
    if let Some(existing) = client.find_duplicate_except(new_name, id, cancel).await? {
        return Ok(EditOutcome::Duplicate(existing));
    }
    client
        .update_with_payload_variants(id, new_name, cancel)
        .await?;
    Ok(EditOutcome::Renamed {
        from: current.name().to_string(),
    })
}

fn resource_client(config: &RegistryConfig, kind: EntityKind) -> Result<ResourceClient> {
    let engine_config = config.engine_config()?;
    let transport: Arc<dyn Transport> = Arc::new(ReqwestTransport::new(&engine_config.fetch)?);
    Ok(ResourceClient::new(
        kind,
        engine_config.base_url_for(kind),
        transport,
        engine_config.retry.clone(),
    )?)
}

fn upload_image(config: &RegistryConfig, file: &Path) -> Result<()> {
    let bytes = fs::read(file).with_context(|| format!("reading {}", file.display()))?;
    let filename = file
        .file_name()
        .and_then(|name| name.to_str())
        .ok_or_else(|| anyhow!("{} has no file name", file.display()))?;

    let engine_config = config.engine_config()?;
    let transport: Arc<dyn Transport> = Arc::new(ReqwestTransport::new(&engine_config.fetch)?);
    let uploader = ImageUploader::new(&config.upload_base_url, transport, config.request_timeout())?;

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    let url = runtime
        .block_on(uploader.upload(
            Bytes::from(bytes),
            filename,
            image_mime(file),
            &CancellationToken::new(),
        ))
        .context("Image upload failed")?;
    println!("{url}");
    Ok(())
}

fn image_mime(file: &Path) -> &'static str {
    let ext = file
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase);
    match ext.as_deref() {
        Some("png") => "image/png",
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        Some("svg") => "image/svg+xml",
        _ => "application/octet-stream",
    }
}
