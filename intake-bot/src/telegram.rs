//! Telegram side of the bot: delivers [`Outbound`] messages and feeds
//! updates into the runner and the reviewer desk.

use async_trait::async_trait;
use intake_flow::{
    DecisionTag, FlowError, FlowRunner, Identity, Inbound, Markup, Outbound, ReviewDecision,
    ReviewerDesk, Transport, review,
};
use teloxide::{
    prelude::*,
    types::{
        InlineKeyboardButton, InlineKeyboardMarkup, KeyboardButton, KeyboardMarkup,
        KeyboardRemove, ReplyMarkup, UserId,
    },
};
use tracing::{debug, error, info, warn};

pub struct TelegramTransport {
    bot: Bot,
}

impl TelegramTransport {
    pub fn new(bot: Bot) -> Self {
        Self { bot }
    }
}

#[async_trait]
impl Transport for TelegramTransport {
    async fn deliver(&self, recipient: Identity, message: Outbound) -> intake_flow::Result<()> {
        let request = self.bot.send_message(ChatId(recipient.0), message.text);
        let request = match render_markup(&message.markup) {
            Some(markup) => request.reply_markup(markup),
            None => request,
        };
        request
            .await
            .map_err(|e| FlowError::DeliveryFailed(e.to_string()))?;
        Ok(())
    }
}

pub fn render_markup(markup: &Markup) -> Option<ReplyMarkup> {
    match markup {
        Markup::None => None,
        Markup::Keyboard { rows, one_time } => {
            let rows = rows
                .iter()
                .map(|row| row.iter().map(KeyboardButton::new).collect::<Vec<_>>())
                .collect::<Vec<_>>();
            let keyboard = KeyboardMarkup::new(rows).resize_keyboard();
            let keyboard = if *one_time {
                keyboard.one_time_keyboard()
            } else {
                keyboard
            };
            Some(ReplyMarkup::Keyboard(keyboard))
        }
        Markup::RemoveKeyboard => Some(ReplyMarkup::KeyboardRemove(KeyboardRemove::new())),
        Markup::Decision { applicant } => {
            Some(ReplyMarkup::InlineKeyboard(decision_keyboard(*applicant)))
        }
    }
}

fn decision_keyboard(applicant: Identity) -> InlineKeyboardMarkup {
    let button = |decision: ReviewDecision| {
        InlineKeyboardButton::callback(
            decision.caption(),
            DecisionTag::new(decision, applicant).encode(),
        )
    };
    InlineKeyboardMarkup::new(vec![vec![
        button(ReviewDecision::Accept),
        button(ReviewDecision::Reject),
    ]])
}

/// Poll Telegram until the process is interrupted.
pub async fn run(bot: Bot, runner: FlowRunner, desk: ReviewerDesk) {
    let handler = dptree::entry()
        .branch(Update::filter_message().endpoint(on_message))
        .branch(Update::filter_callback_query().endpoint(on_callback));

    Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![runner, desk])
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;
}

async fn on_message(msg: Message, runner: FlowRunner) -> ResponseResult<()> {
    if !msg.chat.is_private() {
        return Ok(());
    }
    let Some(text) = msg.text() else {
        debug!(chat_id = %msg.chat.id, "Ignoring non-text message");
        return Ok(());
    };

    // In a private chat the chat id is the user id.
    let mut inbound = Inbound::new(Identity(msg.chat.id.0), text);
    if let Some(username) = msg.chat.username() {
        inbound = inbound.with_display_name(username);
    }

    if let Err(e) = runner.handle(&inbound).await {
        error!(user_id = %inbound.sender, error = %e, "Failed to process message");
    }
    Ok(())
}

/// Telegram user ids are unsigned; identities outside `i64` cannot be mapped.
fn actor_identity(user_id: UserId) -> intake_flow::Result<Identity> {
    i64::try_from(user_id.0)
        .map(Identity)
        .map_err(|_| FlowError::ContextError(format!("user id {} out of range", user_id.0)))
}

async fn on_callback(bot: Bot, query: CallbackQuery, desk: ReviewerDesk) -> ResponseResult<()> {
    let Some(data) = query.data.as_deref() else {
        bot.answer_callback_query(query.id.clone()).await?;
        return Ok(());
    };
    let actor = match actor_identity(query.from.id) {
        Ok(actor) => actor,
        Err(e) => {
            warn!(data, error = %e, "Decision from unmappable user ignored");
            bot.answer_callback_query(query.id.clone())
                .text(review::failure_acknowledgement(&e))
                .await?;
            return Ok(());
        }
    };

    let acknowledgement = match desk.decide(actor, data).await {
        Ok(receipt) => {
            info!(
                user_id = %receipt.applicant,
                status = receipt.status.as_str(),
                "Decision applied"
            );
            if let Some(message) = &query.message {
                // Without markup the call drops the accept/reject buttons.
                if let Err(e) = bot
                    .edit_message_reply_markup(message.chat().id, message.id())
                    .await
                {
                    warn!(error = %e, "Failed to remove decision buttons");
                }
            }
            receipt.acknowledgement
        }
        Err(e) => {
            warn!(actor = %actor, data, error = %e, "Decision not applied");
            review::failure_acknowledgement(&e)
        }
    };

    bot.answer_callback_query(query.id.clone())
        .text(acknowledgement)
        .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use teloxide::types::InlineKeyboardButtonKind;

    #[test]
    fn decision_markup_carries_tags() {
        let Some(ReplyMarkup::InlineKeyboard(keyboard)) =
            render_markup(&Markup::Decision {
                applicant: Identity(55),
            })
        else {
            panic!("expected inline keyboard");
        };

        let row = &keyboard.inline_keyboard[0];
        assert_eq!(row.len(), 2);
        assert_eq!(row[0].text, "Accept");
        assert!(matches!(
            &row[0].kind,
            InlineKeyboardButtonKind::CallbackData(data) if data == "admin:accept:55"
        ));
        assert!(matches!(
            &row[1].kind,
            InlineKeyboardButtonKind::CallbackData(data) if data == "admin:reject:55"
        ));
    }

    #[test]
    fn callback_user_ids_map_to_identities() {
        assert_eq!(actor_identity(UserId(900)).unwrap(), Identity(900));

        let err = actor_identity(UserId(u64::MAX)).unwrap_err();
        assert!(matches!(err, FlowError::ContextError(_)));
        assert_eq!(review::failure_acknowledgement(&err), "Decision failed.");
    }

    #[test]
    fn keyboard_rows_are_preserved() {
        let markup = intake_flow::catalog::main_menu(intake_flow::Language::En).markup;
        let Some(ReplyMarkup::Keyboard(keyboard)) = render_markup(&markup) else {
            panic!("expected reply keyboard");
        };

        assert_eq!(keyboard.keyboard.len(), 2);
        assert_eq!(keyboard.keyboard[0][0].text, "📝 Apply for a job");
        assert_eq!(keyboard.keyboard[1].len(), 2);
    }

    #[test]
    fn no_markup_renders_nothing() {
        assert!(render_markup(&Markup::None).is_none());
        assert!(matches!(
            render_markup(&Markup::RemoveKeyboard),
            Some(ReplyMarkup::KeyboardRemove(_))
        ));
    }
}
