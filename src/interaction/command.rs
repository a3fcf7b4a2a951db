//! Parsing of the bot's message commands.
//!
//! Commands are plain Spanish words at the start of the message; anything
//! that is not a recognized command is treated as a free-form transaction.

/// A parsed bot command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// `/start` greeting.
    Start,
    /// `eliminar <transaction_id> <nombre>`.
    Delete { transaction_id: String, user_name: String },
    /// `eliminar` with the wrong number of arguments.
    DeleteUsage,
    /// `editar <transaction_id> <nuevo mensaje>`.
    Edit { transaction_id: String, new_text: String },
    /// `editar` with the wrong number of arguments.
    EditUsage,
    /// `cierre <nombre>`.
    Closure { user_name: String },
    /// `cierre` with the wrong number of arguments.
    ClosureUsage,
    /// `inventario: <texto>` bulk stock update.
    Inventory { text: String },
    /// `perdida: <texto>` stock loss.
    Loss { text: String },
    /// Anything else: a free-form sale/expense message.
    Insert { text: String },
}

impl Command {
    /// Parse a message. Prefix matching is case-insensitive; arguments keep
    /// their original casing.
    pub fn parse(message: &str) -> Self {
        let text = message.trim();
        let lowered = text.to_lowercase();

        if lowered == "/start" || lowered.starts_with("/start ") {
            return Command::Start;
        }

        if lowered.starts_with("eliminar") {
            let parts: Vec<&str> = text.split_whitespace().collect();
            return match parts.as_slice() {
                [_, transaction_id, user_name] => Command::Delete {
                    transaction_id: (*transaction_id).to_string(),
                    user_name: (*user_name).to_string(),
                },
                _ => Command::DeleteUsage,
            };
        }

        if lowered.starts_with("editar") {
            // The new text goes back through the LLM verbatim, so keep its
            // internal whitespace intact.
            let rest = next_token(text).map_or("", |(_, rest)| rest);
            return match next_token(rest) {
                Some((transaction_id, new_text)) if !new_text.is_empty() => Command::Edit {
                    transaction_id: transaction_id.to_string(),
                    new_text: new_text.to_string(),
                },
                _ => Command::EditUsage,
            };
        }

        if lowered.starts_with("cierre") {
            let parts: Vec<&str> = text.split_whitespace().collect();
            return match parts.as_slice() {
                [_, user_name] => Command::Closure { user_name: (*user_name).to_string() },
                _ => Command::ClosureUsage,
            };
        }

        if lowered.starts_with("inventario:") {
            return Command::Inventory {
                text: after_colon(text).to_string(),
            };
        }

        if lowered.starts_with("perdida:") {
            return Command::Loss {
                text: after_colon(text).to_string(),
            };
        }

        Command::Insert { text: text.to_string() }
    }
}

fn after_colon(text: &str) -> &str {
    text.split_once(':').map(|(_, rest)| rest.trim()).unwrap_or("")
}

/// Split off the next whitespace-delimited token; the remainder loses its
/// leading whitespace only.
fn next_token(text: &str) -> Option<(&str, &str)> {
    let text = text.trim_start();
    if text.is_empty() {
        return None;
    }

    match text.find(char::is_whitespace) {
        Some(split) => Some((&text[..split], text[split..].trim_start())),
        None => Some((text, "")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn start_is_recognized() {
        assert_eq!(Command::parse("/start"), Command::Start);
        assert_eq!(Command::parse("  /START  "), Command::Start);
    }

    #[test]
    fn delete_requires_exactly_two_arguments() {
        assert_eq!(
            Command::parse("eliminar abc-123 Ana"),
            Command::Delete {
                transaction_id: "abc-123".to_string(),
                user_name: "Ana".to_string(),
            }
        );
        assert_eq!(Command::parse("eliminar abc-123"), Command::DeleteUsage);
        assert_eq!(Command::parse("eliminar a b c"), Command::DeleteUsage);
    }

    #[test]
    fn edit_keeps_the_rest_of_the_message() {
        assert_eq!(
            Command::parse("editar abc-123 vendimos 3 rosas a 5"),
            Command::Edit {
                transaction_id: "abc-123".to_string(),
                new_text: "vendimos 3 rosas a 5".to_string(),
            }
        );
        assert_eq!(Command::parse("editar abc-123"), Command::EditUsage);
        assert_eq!(Command::parse("editar abc-123   "), Command::EditUsage);
    }

    #[test]
    fn edit_preserves_internal_whitespace_in_the_new_text() {
        assert_eq!(
            Command::parse("editar  abc-123   vendimos  2   rosas a 5"),
            Command::Edit {
                transaction_id: "abc-123".to_string(),
                new_text: "vendimos  2   rosas a 5".to_string(),
            }
        );
    }

    #[test]
    fn closure_takes_a_single_name() {
        assert_eq!(Command::parse("cierre Ana"), Command::Closure { user_name: "Ana".to_string() });
        assert_eq!(Command::parse("CIERRE Ana"), Command::Closure { user_name: "Ana".to_string() });
        assert_eq!(Command::parse("cierre"), Command::ClosureUsage);
        assert_eq!(Command::parse("cierre Ana Morales"), Command::ClosureUsage);
    }

    #[test]
    fn inventory_and_loss_strip_the_prefix() {
        assert_eq!(
            Command::parse("inventario: 24 rosas premium"),
            Command::Inventory { text: "24 rosas premium".to_string() }
        );
        assert_eq!(Command::parse("Perdida: 3 girasoles"), Command::Loss { text: "3 girasoles".to_string() });
        assert_eq!(Command::parse("inventario:"), Command::Inventory { text: "".to_string() });
    }

    #[test]
    fn prefix_matching_is_case_insensitive() {
        assert!(matches!(Command::parse("Eliminar abc Ana"), Command::Delete { .. }));
        assert!(matches!(Command::parse("EDITAR abc nuevo texto"), Command::Edit { .. }));
    }

    #[test]
    fn everything_else_is_a_free_form_insert() {
        assert_eq!(
            Command::parse("  vendimos una docena de rosas a 15  "),
            Command::Insert {
                text: "vendimos una docena de rosas a 15".to_string()
            }
        );
    }
}
