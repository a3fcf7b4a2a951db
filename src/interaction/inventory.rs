//! Bulk inventory updates and loss recording.

use tracing::instrument;

use crate::{
    base::types::{OperationType, Void, now_local_iso},
    service::store::InventoryLossRecord,
};

use super::{UpdateContext, format_issue_list, notify::notify_owner};

/// Handle `inventario:`: set absolute stock for every extracted entry.
#[instrument(skip_all)]
pub async fn handle_bulk_update(ctx: &UpdateContext, message: &str, content: &str) -> Void {
    let entries = ctx.llm.interpret_inventory(content, &ctx.model).await?;

    if entries.is_empty() {
        ctx.chat
            .send_message(ctx.chat_id, "No se encontraron entradas válidas para el inventario en el mensaje.")
            .await?;
        return Ok(());
    }

    for entry in &entries {
        ctx.store.update_inventory(entry).await?;
    }

    ctx.audit(OperationType::BulkInventoryUpdate, message, &ctx.user_name, None).await?;

    ctx.chat
        .send_message(ctx.chat_id, &format!("✅ Inventario actualizado con {} entradas.", entries.len()))
        .await?;

    notify_owner(
        ctx,
        &format!(
            "🔔 Notificación de administración:\n\nOperación realizada por {} (ID: {})\nAcción: Actualización de inventario\nMensaje: {message}",
            ctx.user_name, ctx.user_id
        ),
    )
    .await;

    Ok(())
}

/// Handle `perdida:`: deduct lost stock and keep a loss record per entry.
#[instrument(skip_all)]
pub async fn handle_loss(ctx: &UpdateContext, message: &str, content: &str) -> Void {
    let entries = ctx.llm.interpret_inventory(content, &ctx.model).await?;

    if entries.is_empty() {
        ctx.chat
            .send_message(ctx.chat_id, "No se encontraron entradas válidas para la pérdida en el mensaje.")
            .await?;
        return Ok(());
    }

    let timestamp = now_local_iso();
    let mut issues = Vec::new();

    for entry in &entries {
        // Losses deduct like a sale, under a sentinel transaction id.
        issues.extend(ctx.store.deduct_inventory(std::slice::from_ref(entry), "PERDIDA").await?);

        ctx.store
            .log_inventory_loss(&InventoryLossRecord {
                timestamp: timestamp.clone(),
                user_id: ctx.user_id,
                user_name: ctx.user_name.clone(),
                chat_id: ctx.chat_id,
                item: entry.item.clone(),
                quality: entry.quality.clone(),
                quantity: entry.quantity,
                original_message: message.to_string(),
            })
            .await?;
    }

    ctx.audit(OperationType::InventoryLoss, message, &ctx.user_name, None).await?;

    ctx.chat
        .send_message(
            ctx.chat_id,
            &format!("✅ Inventario actualizado. Se registró la pérdida de {} entradas.", entries.len()),
        )
        .await?;

    if !issues.is_empty() {
        ctx.chat
            .send_message(ctx.owner_id, &format!("⚠️ Problemas al registrar la pérdida:\n{}", format_issue_list(&issues)))
            .await?;
    }

    notify_owner(
        ctx,
        &format!(
            "🔔 Notificación de administración:\n\nOperación realizada por {} (ID: {})\nAcción: Pérdida de inventario\nMensaje: {message}",
            ctx.user_name, ctx.user_id
        ),
    )
    .await;

    Ok(())
}
