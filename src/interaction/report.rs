//! End-of-day cash closure report.

use tracing::instrument;

use crate::base::types::{ClosureReport, OperationType, Void, today_local};

use super::{UpdateContext, notify::notify_owner};

/// Handle `cierre`: aggregate today's figures and reply with the summary.
#[instrument(skip_all)]
pub async fn handle_closure(ctx: &UpdateContext, user_name: &str) -> Void {
    let today = today_local();
    let report = ctx.warehouse.closure_report(&today).await?;

    if report.is_empty() {
        ctx.chat.send_message(ctx.chat_id, "No hay datos para el cierre de hoy.").await?;
        return Ok(());
    }

    ctx.chat
        .send_message(ctx.chat_id, &format!("🔔 Resumen del cierre de caja:\n\n{}", format_closure(&report)))
        .await?;

    ctx.audit(OperationType::ClosureReport, &format!("Cierre de caja para {today}"), user_name, None).await?;

    notify_owner(
        ctx,
        &format!(
            "🔔 Notificación de administración:\n\nOperación realizada por {user_name} (ID: {})\nAcción: Cierre de caja\nFecha: {today}\n\n{}",
            ctx.user_id,
            format_closure(&report)
        ),
    )
    .await;

    Ok(())
}

/// The closure figures, one line each, as sent to the chat.
fn format_closure(report: &ClosureReport) -> String {
    format!(
        "🏦 Ventas por transferencia bancaria: ${}\n💵 Ventas en efectivo: ${}\n💰 Gastos del día: ${}\n💵 Total efectivo en caja: ${}",
        money(report.transfer()),
        money(report.cash_sales()),
        money(report.expenses()),
        money(report.cash_in_till()),
    )
}

fn money(value: f64) -> String {
    format!("{value:.2}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn closure_lines_carry_the_till_arithmetic() {
        let report = ClosureReport {
            efectivo_sales: Some(120.0),
            transfer_sales: Some(35.5),
            total_expenses: Some(20.25),
        };

        let formatted = format_closure(&report);

        assert!(formatted.contains("transferencia bancaria: $35.50"));
        assert!(formatted.contains("efectivo: $120.00"));
        assert!(formatted.contains("Gastos del día: $20.25"));
        assert!(formatted.contains("Total efectivo en caja: $99.75"));
    }

    #[test]
    fn missing_figures_render_as_zero() {
        let report = ClosureReport {
            efectivo_sales: None,
            transfer_sales: None,
            total_expenses: Some(10.0),
        };

        let formatted = format_closure(&report);
        assert!(formatted.contains("Total efectivo en caja: $-10.00"));
    }
}
