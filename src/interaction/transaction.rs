//! Transaction capture, edit, and delete handlers.

use tracing::{info, instrument};
use uuid::Uuid;

use crate::base::types::{OperationType, TransactionRow, Void, today_local};

use super::{UpdateContext, format_issue_list, notify::notify_owner, sale_to_inventory_entry};

/// Handle a free-form message: extract, persist, deduct inventory, confirm.
#[instrument(skip_all)]
pub async fn handle_insert(ctx: &UpdateContext, message: &str) -> Void {
    let parsed = ctx.llm.interpret_transaction(message, &ctx.model).await?;

    if parsed.is_empty() {
        ctx.chat.send_message(ctx.chat_id, "No se encontró ninguna venta ni gasto en el mensaje.").await?;
        return Ok(());
    }

    let transaction_id = Uuid::new_v4().to_string();
    let row = TransactionRow::from_parsed(parsed.clone(), transaction_id.clone(), today_local());

    // Persist first so the ledger keeps the record even if inventory
    // operations fail afterwards.
    ctx.warehouse.insert_transaction(&row).await?;

    if !row.sales.is_empty() {
        let entries: Vec<_> = row.sales.iter().map(sale_to_inventory_entry).collect();
        let issues = ctx.store.deduct_inventory(&entries, &transaction_id).await?;

        if !issues.is_empty() {
            ctx.chat
                .send_message(ctx.owner_id, &format!("⚠️ Problemas con el inventario:\n{}", format_issue_list(&issues)))
                .await?;
        }
    }

    let user_name = parsed.sender_name.clone().unwrap_or_else(|| ctx.user_name.clone());
    ctx.audit(OperationType::DataInsert, message, &user_name, Some(transaction_id.clone())).await?;

    let summary = ctx.llm.summarize_transaction(&parsed, message, &ctx.model).await?;
    ctx.chat
        .send_message(ctx.chat_id, &format!("{summary}\n\n✅ ID de Transacción guardada correctamente."))
        .await?;
    ctx.chat.send_markdown(ctx.chat_id, &format!("`{transaction_id}`")).await?;

    notify_owner(
        ctx,
        &format!(
            "🔔 Nueva operación registrada por {user_name} (ID: {}):\n\n{message}\n\nID de Transacción: {transaction_id}",
            ctx.user_id
        ),
    )
    .await;

    info!("Recorded transaction `{transaction_id}`.");

    Ok(())
}

/// Handle `eliminar`: restore inventory and soft-delete the row.
#[instrument(skip_all)]
pub async fn handle_delete(ctx: &UpdateContext, message: &str, transaction_id: &str, user_name: &str) -> Void {
    let Some(transaction) = ctx.warehouse.get_transaction(transaction_id).await? else {
        ctx.chat.send_message(ctx.chat_id, "❌ Transacción no encontrada.").await?;
        return Ok(());
    };

    for sale in &transaction.sales {
        ctx.store.restore_inventory(&sale_to_inventory_entry(sale)).await?;
    }

    ctx.warehouse.soft_delete(transaction_id).await?;

    ctx.chat.send_message(ctx.chat_id, "✅ ID de Transacción eliminada correctamente.").await?;
    ctx.chat.send_markdown(ctx.chat_id, &format!("`{transaction_id}`")).await?;

    ctx.audit(OperationType::DeleteTransaction, message, user_name, Some(transaction_id.to_string())).await?;

    notify_owner(
        ctx,
        &format!(
            "🔔 Notificación de administración:\n\nOperación realizada por {user_name} (ID: {}).\nAcción: Eliminar\nID de Transacción: {transaction_id}",
            ctx.user_id
        ),
    )
    .await;

    Ok(())
}

/// Handle `editar`: re-extract the new text and replace the row.
#[instrument(skip_all)]
pub async fn handle_edit(ctx: &UpdateContext, message: &str, transaction_id: &str, new_text: &str) -> Void {
    let parsed = ctx.llm.interpret_transaction(new_text, &ctx.model).await?;
    let user_name = parsed.sender_name.clone().unwrap_or_else(|| ctx.user_name.clone());

    let replacement = TransactionRow::from_parsed(parsed, transaction_id.to_string(), today_local());
    ctx.warehouse.soft_edit(transaction_id, replacement).await?;

    ctx.chat.send_message(ctx.chat_id, "✅ ID de Transacción actualizada correctamente.").await?;
    ctx.chat.send_markdown(ctx.chat_id, &format!("`{transaction_id}`")).await?;

    ctx.audit(OperationType::EditTransaction, message, &user_name, Some(transaction_id.to_string())).await?;

    notify_owner(
        ctx,
        &format!(
            "🔔 Notificación de administración:\n\nOperación realizada por {user_name} (ID: {})\nAcción: Editar\nID de Transacción: {transaction_id}",
            ctx.user_id
        ),
    )
    .await;

    Ok(())
}
