//! Message texts. Request cards are HTML; status and stats are plain text.

use teloxide::utils::html;

use crate::domains::requests::{CategoryCount, FreelanceRequest, ParseLog, ParseStatus};

const DATE_FORMAT: &str = "%d.%m.%Y %H:%M";
const TIMESTAMP_FORMAT: &str = "%d.%m.%Y %H:%M:%S";

pub const WELCOME_TEXT: &str = "👋 Привет! Я собираю заказы для фрилансеров из Telegram-чатов.\n\n\
Выберите категорию, чтобы посмотреть свежие запросы:";

pub const CATEGORIES_TEXT: &str = "📂 Выберите категорию:";

pub const PERIOD_TEXT: &str = "📅 За какой период показать запросы?";

pub const NO_RESULTS_TEXT: &str = "😔 По вашему запросу не найдено фриланс-запросов.\n\n\
Попробуйте:\n\
• Выбрать другой период\n\
• Выбрать другую категорию\n\
• Вернуться в главное меню";

pub const PARSE_STARTED_TEXT: &str = "🚀 Парсинг запущен\n\n\
Фоновый процесс начал обработку чатов. Используйте /status для проверки прогресса.";

pub const PAGE_NOT_FOUND: &str = "❌ Страница не найдена";
pub const CALLBACK_ERROR: &str = "❌ Ошибка обработки запроса";

/// One request as an HTML card.
pub fn format_request(request: &FreelanceRequest) -> String {
    let icon = if request.is_urgent() { "🔴" } else { "🟢" };

    let mut text = format!(
        "{} <b>{}</b>\n\n{}\n\n💰 Бюджет: {}",
        icon,
        html::escape(&request.title),
        html::escape(&request.description),
        html::escape(&request.budget),
    );

    if !request.skills.is_empty() {
        let skills = request.skills.join(", ");
        text.push_str(&format!("\n💼 Навыки: {}", html::escape(&skills)));
    }

    if let Some(contact) = request.contact.as_deref().filter(|c| !c.is_empty()) {
        text.push_str(&format!("\n📞 Контакт: {}", html::escape(contact)));
    }

    text.push_str(&format!("\n\n📅 {}", request.message_date.format(DATE_FORMAT)));
    text
}

/// Card plus the "n of total" footer.
pub fn format_request_with_position(request: &FreelanceRequest, position: i64, total: i64) -> String {
    format!(
        "{}\n\n📊 Запрос {} из {}",
        format_request(request),
        position,
        total
    )
}

pub fn format_parse_error(error: &str) -> String {
    format!("❌ Ошибка при запуске парсинга\n\nДетали: {}", error)
}

pub fn format_status(log: Option<&ParseLog>) -> String {
    let Some(log) = log else {
        return "📊 Статус парсинга\n\n❌ Логов парсинга не найдено".to_string();
    };

    let (emoji, label) = match log.status() {
        Some(ParseStatus::Success) => ("✅", "Успешно"),
        Some(ParseStatus::Running) => ("⏳", "Выполняется"),
        _ => ("❌", "Ошибка"),
    };
    let finished = log
        .finished_at
        .map(|t| t.format(TIMESTAMP_FORMAT).to_string())
        .unwrap_or_else(|| "В процессе...".to_string());

    let mut text = format!(
        "📊 Статус парсинга\n\n\
         {} Статус: {}\n\
         ⏱️ Начало: {}\n\
         ⏱️ Окончание: {}\n\
         📁 Чатов обработано: {}\n\
         💬 Сообщений найдено: {}\n\
         ✨ Запросов извлечено: {}",
        emoji,
        label,
        log.started_at.format(TIMESTAMP_FORMAT),
        finished,
        log.chats_parsed,
        log.messages_found,
        log.requests_extracted,
    );

    if let Some(error) = &log.error_message {
        text.push_str(&format!("\n\n⚠️ Ошибка: {}", error));
    }
    text
}

/// Counts per category, largest first, with each category's share.
pub fn format_stats(stats: &[CategoryCount]) -> String {
    if stats.is_empty() {
        return "📈 Статистика\n\n❌ Запросов не найдено".to_string();
    }

    let mut sorted = stats.to_vec();
    sorted.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.category.cmp(&b.category)));
    let total: i64 = sorted.iter().map(|s| s.count).sum();

    let mut text = String::from("📈 Статистика по категориям\n\n");
    for stat in &sorted {
        let percentage = if total > 0 {
            stat.count as f64 / total as f64 * 100.0
        } else {
            0.0
        };
        text.push_str(&format!("📁 {}: {} ({:.1}%)\n", stat.category, stat.count, percentage));
    }
    text.push_str(&format!("\n📊 Всего запросов: {}", total));
    text
}
