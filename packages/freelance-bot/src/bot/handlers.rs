use anyhow::Result;
use sqlx::PgPool;
use std::sync::Arc;
use teloxide::dispatching::UpdateHandler;
use teloxide::prelude::*;
use teloxide::types::{InlineKeyboardMarkup, MessageId, ParseMode};
use teloxide::utils::command::BotCommands;
use teloxide::{ApiError, RequestError};

use super::callbacks::{CallbackData, CategorySelection};
use super::format::{
    format_parse_error, format_request_with_position, format_stats, format_status,
    CALLBACK_ERROR, CATEGORIES_TEXT, NO_RESULTS_TEXT, PAGE_NOT_FOUND, PARSE_STARTED_TEXT,
    PERIOD_TEXT, WELCOME_TEXT,
};
use super::keyboards::{back_keyboard, categories_keyboard, pagination_keyboard, period_keyboard};
use crate::common::{PageRequest, PAGE_SIZE};
use crate::config::Config;
use crate::domains::categories::Category;
use crate::domains::requests::{FreelanceRequest, ParseLog, RequestFilter};
use crate::kernel::trigger::request_parse;

type HandlerResult = Result<()>;

#[derive(BotCommands, Clone, Debug, PartialEq, Eq)]
#[command(rename_rule = "lowercase", description = "Доступные команды:")]
pub enum Command {
    #[command(description = "главное меню")]
    Start,
    #[command(description = "помощь")]
    Help,
    #[command(description = "статус последнего парсинга (админ)")]
    Status,
    #[command(description = "запустить парсинг (админ)")]
    Parse,
    #[command(description = "статистика по категориям (админ)")]
    Stats,
}

impl Command {
    pub fn is_admin_only(&self) -> bool {
        matches!(self, Command::Status | Command::Parse | Command::Stats)
    }
}

/// Shared state injected into every handler.
#[derive(Clone)]
pub struct BotState {
    pub pool: PgPool,
    pub config: Arc<Config>,
}

impl BotState {
    pub fn new(pool: PgPool, config: Config) -> Self {
        Self {
            pool,
            config: Arc::new(config),
        }
    }

    fn is_admin(&self, user_id: Option<i64>) -> bool {
        user_id.is_some_and(|id| self.config.is_admin(id))
    }
}

pub fn schema() -> UpdateHandler<anyhow::Error> {
    dptree::entry()
        .branch(
            Update::filter_message()
                .filter_command::<Command>()
                .endpoint(handle_command),
        )
        .branch(Update::filter_callback_query().endpoint(handle_callback))
}

// =============================================================================
// Commands
// =============================================================================

async fn handle_command(bot: Bot, msg: Message, cmd: Command, state: BotState) -> HandlerResult {
    let user_id = msg.from.as_ref().and_then(|u| i64::try_from(u.id.0).ok());

    if cmd.is_admin_only() && !state.is_admin(user_id) {
        tracing::debug!(user_id = ?user_id, command = ?cmd, "Ignoring admin command from non-admin");
        return Ok(());
    }

    match cmd {
        Command::Start | Command::Help => {
            let categories = Category::find_active(&state.pool).await?;
            bot.send_message(msg.chat.id, WELCOME_TEXT)
                .reply_markup(categories_keyboard(&categories))
                .await?;
        }
        Command::Status => {
            let latest = ParseLog::latest(&state.pool).await?;
            bot.send_message(msg.chat.id, format_status(latest.as_ref()))
                .reply_markup(back_keyboard())
                .await?;
        }
        Command::Parse => {
            let text = match request_parse(user_id.unwrap_or_default(), &state.pool).await {
                Ok(()) => PARSE_STARTED_TEXT.to_string(),
                Err(e) => {
                    tracing::error!(error = %e, "Failed to trigger parse");
                    format_parse_error(&e.to_string())
                }
            };
            bot.send_message(msg.chat.id, text)
                .reply_markup(back_keyboard())
                .await?;
        }
        Command::Stats => {
            let stats = FreelanceRequest::stats_by_category(&state.pool).await?;
            bot.send_message(msg.chat.id, format_stats(&stats))
                .reply_markup(back_keyboard())
                .await?;
        }
    }

    Ok(())
}

// =============================================================================
// Callbacks
// =============================================================================

async fn handle_callback(bot: Bot, q: CallbackQuery, state: BotState) -> HandlerResult {
    let parsed = q.data.as_deref().map(str::parse::<CallbackData>);

    let (data, message) = match (parsed, q.message.as_ref()) {
        (Some(Ok(data)), Some(message)) => (data, message),
        (Some(Err(e)), _) => {
            tracing::warn!(error = %e, "Bad callback data");
            return alert(&bot, &q, CALLBACK_ERROR).await;
        }
        _ => {
            bot.answer_callback_query(q.id.clone()).await?;
            return Ok(());
        }
    };
    let chat_id = message.chat().id;
    let message_id = message.id();

    match data {
        CallbackData::Category(category) => {
            edit(&bot, chat_id, message_id, PERIOD_TEXT, period_keyboard(&category), false).await?;
        }
        CallbackData::Period { days, category } => {
            let page = PageRequest::first(PAGE_SIZE);
            let (requests, total) = fetch_page(&state, &category, days, page).await?;

            match requests.first() {
                Some(request) => {
                    let text = format_request_with_position(request, page.offset() + 1, total);
                    let keyboard = pagination_keyboard(&category, days, page, total);
                    edit(&bot, chat_id, message_id, &text, keyboard, true).await?;
                }
                None => {
                    edit(&bot, chat_id, message_id, NO_RESULTS_TEXT, back_keyboard(), false).await?;
                }
            }
        }
        CallbackData::Page {
            page,
            category,
            days,
        } => {
            let page = PageRequest::new(page, PAGE_SIZE);
            let (requests, total) = fetch_page(&state, &category, days, page).await?;

            let Some(request) = requests.first() else {
                return alert(&bot, &q, PAGE_NOT_FOUND).await;
            };
            let text = format_request_with_position(request, page.offset() + 1, total);
            let keyboard = pagination_keyboard(&category, days, page, total);
            edit(&bot, chat_id, message_id, &text, keyboard, true).await?;
        }
        CallbackData::PageInfo => {}
        CallbackData::BackToCategories => {
            let categories = Category::find_active(&state.pool).await?;
            edit(
                &bot,
                chat_id,
                message_id,
                CATEGORIES_TEXT,
                categories_keyboard(&categories),
                false,
            )
            .await?;
        }
    }

    bot.answer_callback_query(q.id.clone()).await?;
    Ok(())
}

async fn fetch_page(
    state: &BotState,
    category: &CategorySelection,
    days: i64,
    page: PageRequest,
) -> Result<(Vec<FreelanceRequest>, i64)> {
    let filter = RequestFilter {
        category: category.as_filter().map(String::from),
        days,
        page,
    };
    FreelanceRequest::find_page(&filter, &state.pool).await
}

async fn alert(bot: &Bot, q: &CallbackQuery, text: &str) -> HandlerResult {
    bot.answer_callback_query(q.id.clone())
        .text(text)
        .show_alert(true)
        .await?;
    Ok(())
}

/// Edit a bot message in place. Re-sending identical content is not an error.
async fn edit(
    bot: &Bot,
    chat_id: ChatId,
    message_id: MessageId,
    text: &str,
    keyboard: InlineKeyboardMarkup,
    html: bool,
) -> HandlerResult {
    let mut request = bot
        .edit_message_text(chat_id, message_id, text)
        .reply_markup(keyboard);
    if html {
        request = request.parse_mode(ParseMode::Html);
    }

    match request.await {
        Ok(_) | Err(RequestError::Api(ApiError::MessageNotModified)) => Ok(()),
        Err(e) => Err(e.into()),
    }
}

/// Run the dispatcher until Ctrl-C.
pub async fn run_bot(bot: Bot, state: BotState) -> Result<()> {
    if let Err(e) = bot.set_my_commands(public_commands()).await {
        tracing::warn!(error = %e, "Failed to register bot commands");
    }

    tracing::info!("Bot dispatcher starting");
    Dispatcher::builder(bot, schema())
        .dependencies(dptree::deps![state])
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;

    tracing::info!("Bot stopped");
    Ok(())
}

/// Commands shown in the client menu; admin commands stay unlisted.
fn public_commands() -> Vec<teloxide::types::BotCommand> {
    Command::bot_commands()
        .into_iter()
        .filter(|c| matches!(c.command.trim_start_matches('/'), "start" | "help"))
        .collect()
}
