//! Entry point for incoming Telegram updates.

use tracing::{Instrument, error, instrument, warn};

use crate::{
    base::{
        config::Config,
        types::{AuditEntry, OperationType, Void, now_local_iso},
    },
    service::{
        chat::{ChatClient, telegram::Update},
        llm::LlmClient,
        store::StoreClient,
        warehouse::WarehouseClient,
    },
};

use super::{UpdateContext, command::Command, inventory, notify, report, transaction};

const GREETING: &str = "Hola, soy tu bot de ventas y gastos para la floristería Morale's 🌸";

/// Process one update in the background, logging any failure.
#[instrument(skip_all)]
pub fn handle_update(update: Update, config: Config, store: StoreClient, warehouse: WarehouseClient, llm: LlmClient, chat: ChatClient) {
    tokio::spawn(async move {
        let result = handle_update_internal(update, config, store, warehouse, llm, chat).in_current_span().await;

        if let Err(err) = &result {
            error!("Error while handling update: {err}");
        }
    });
}

#[instrument(skip_all)]
async fn handle_update_internal(update: Update, config: Config, store: StoreClient, warehouse: WarehouseClient, llm: LlmClient, chat: ChatClient) -> Void {
    let Some(message) = update.message else {
        warn!("Skipping update without a message.");
        return Ok(());
    };

    let Some(text) = message.text else {
        warn!("Skipping message without text.");
        return Ok(());
    };

    let Some(from) = message.from else {
        warn!("Skipping message without a sender.");
        return Ok(());
    };

    let chat_id = message.chat.id;
    let user_id = from.id;
    let user_name = from.full_name();

    let allowed_users = store.load_allowed_user_ids().await?;
    if !allowed_users.contains(&user_id) {
        return handle_unauthorized(&warehouse, &chat, &text, chat_id, user_id, &user_name).await;
    }

    let settings = store.load_bot_settings().await?;
    let owner_id = store.load_owner_id().await?;
    let model = settings.gpt_model.clone().unwrap_or_else(|| config.openai_model.clone());

    let ctx = UpdateContext {
        store,
        warehouse,
        llm,
        chat,
        settings,
        owner_id,
        model,
        chat_id,
        user_id,
        user_name,
    };

    dispatch(&ctx, &text).await
}

/// Route a message to its handler; handler failures go to the developer.
pub async fn dispatch(ctx: &UpdateContext, text: &str) -> Void {
    let result = match Command::parse(text) {
        Command::Start => return ctx.chat.send_message(ctx.chat_id, GREETING).await,
        Command::DeleteUsage => {
            return ctx
                .chat
                .send_message(ctx.chat_id, "Formato incorrecto. Usa: eliminar <transaction_id> <nombre del usuario>")
                .await;
        }
        Command::EditUsage => {
            return ctx
                .chat
                .send_message(ctx.chat_id, "Formato incorrecto. Usa: editar <transaction_id> <nuevo mensaje>")
                .await;
        }
        Command::ClosureUsage => {
            return ctx.chat.send_message(ctx.chat_id, "Formato incorrecto. Usa: cierre <nombre del usuario>").await;
        }
        Command::Delete { transaction_id, user_name } => transaction::handle_delete(ctx, text, &transaction_id, &user_name)
            .await
            .map_err(|e| ("eliminar", e)),
        Command::Edit { transaction_id, new_text } => transaction::handle_edit(ctx, text, &transaction_id, &new_text)
            .await
            .map_err(|e| ("editar", e)),
        Command::Closure { user_name } => report::handle_closure(ctx, &user_name).await.map_err(|e| ("cierre", e)),
        Command::Inventory { text: content } => inventory::handle_bulk_update(ctx, text, &content).await.map_err(|e| ("inventario", e)),
        Command::Loss { text: content } => inventory::handle_loss(ctx, text, &content).await.map_err(|e| ("perdida", e)),
        Command::Insert { text: content } => transaction::handle_insert(ctx, &content).await.map_err(|e| ("insertar", e)),
    };

    if let Err((action, err)) = result {
        error!("Handler `{action}` failed: {err}");
        notify::notify_error(ctx, action, &err.to_string()).await?;
    }

    Ok(())
}

/// Tell an unknown user their id and leave an audit trail.
async fn handle_unauthorized(warehouse: &WarehouseClient, chat: &ChatClient, text: &str, chat_id: i64, user_id: i64, user_name: &str) -> Void {
    chat.send_message(
        chat_id,
        &format!("Tu ID de usuario de Telegram es: {user_id}\nCompártelo con el administrador para que te dé acceso."),
    )
    .await?;

    warehouse
        .log_audit(&AuditEntry {
            timestamp: now_local_iso(),
            user_id,
            chat_id,
            operation_type: OperationType::UnauthorizedAccess,
            message_content: text.to_string(),
            user_name: user_name.to_string(),
            transaction_id: None,
        })
        .await?;

    Ok(())
}
