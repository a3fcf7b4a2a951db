//! Owner and developer notifications.

use tracing::error;

use crate::base::types::Void;

use super::UpdateContext;

/// Send a live notification to the owner, when enabled.
///
/// Notification failures are logged and swallowed: they must never fail the
/// operation that triggered them.
pub async fn notify_owner(ctx: &UpdateContext, text: &str) {
    if !ctx.settings.live_notifications {
        return;
    }

    if let Err(err) = ctx.chat.send_message(ctx.owner_id, text).await {
        error!("Error notifying the owner: {err}");
    }
}

/// Report a handler failure to the configured developer and tell the user.
///
/// When no developer id is configured, nothing is sent.
pub async fn notify_error(ctx: &UpdateContext, action: &str, error_message: &str) -> Void {
    let Some(developer_id) = ctx.settings.developer_id else {
        return Ok(());
    };

    ctx.chat
        .send_message(
            developer_id,
            &format!(
                "🚨 Error Report:\n\nUser: {} (ID: {})\nAction: {}\nError: {}",
                ctx.user_name, ctx.user_id, action, error_message
            ),
        )
        .await?;

    ctx.chat
        .send_message(
            ctx.chat_id,
            "❌ Hubo un error al procesar tu solicitud. El desarrollador ha sido notificado. Por favor intenta más tarde.",
        )
        .await?;

    Ok(())
}
