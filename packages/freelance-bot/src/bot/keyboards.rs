use teloxide::types::{InlineKeyboardButton, InlineKeyboardMarkup};

use super::callbacks::{CallbackData, CategorySelection};
use crate::common::PageRequest;
use crate::domains::categories::Category;

pub const PERIODS: [i64; 2] = [7, 30];

/// A callback button, or `None` (logged) if the data would not fit.
fn button(text: impl Into<String>, data: CallbackData) -> Option<InlineKeyboardButton> {
    match data.encode() {
        Ok(encoded) => Some(InlineKeyboardButton::callback(text, encoded)),
        Err(e) => {
            tracing::warn!(error = %e, "Skipping button");
            None
        }
    }
}

/// Two categories per row. "All categories" joins the last row when it has
/// a free slot, otherwise it gets a row of its own.
pub fn categories_keyboard(categories: &[Category]) -> InlineKeyboardMarkup {
    let buttons: Vec<InlineKeyboardButton> = categories
        .iter()
        .filter_map(|c| {
            button(
                c.name.as_str(),
                CallbackData::Category(CategorySelection::Slug(c.slug.clone())),
            )
        })
        .collect();

    let mut rows: Vec<Vec<InlineKeyboardButton>> =
        buttons.chunks(2).map(<[InlineKeyboardButton]>::to_vec).collect();

    let all = InlineKeyboardButton::callback(
        "📊 All categories",
        CallbackData::Category(CategorySelection::All).to_string(),
    );
    match rows.last_mut() {
        Some(last) if last.len() < 2 => last.push(all),
        _ => rows.push(vec![all]),
    }

    InlineKeyboardMarkup::new(rows)
}

pub fn period_keyboard(category: &CategorySelection) -> InlineKeyboardMarkup {
    let periods: Vec<InlineKeyboardButton> = PERIODS
        .iter()
        .filter_map(|&days| {
            button(
                format!("📅 Last {} days", days),
                CallbackData::Period {
                    days,
                    category: category.clone(),
                },
            )
        })
        .collect();

    InlineKeyboardMarkup::new(vec![periods, vec![back_button("🔙 Back")]])
}

/// Previous / "Page x/y" / Next, then a row back to the category list.
pub fn pagination_keyboard(
    category: &CategorySelection,
    days: i64,
    page: PageRequest,
    total: i64,
) -> InlineKeyboardMarkup {
    let page_link = |target: PageRequest| CallbackData::Page {
        page: target.page,
        category: category.clone(),
        days,
    };

    let mut nav = Vec::new();
    if page.has_previous() {
        nav.extend(button("⬅️ Previous", page_link(page.previous())));
    }
    nav.push(InlineKeyboardButton::callback(
        format!("Page {}/{}", page.page + 1, page.total_pages(total).max(1)),
        CallbackData::PageInfo.to_string(),
    ));
    if page.has_next(total) {
        nav.extend(button("Next ➡️", page_link(page.next())));
    }

    InlineKeyboardMarkup::new(vec![nav, vec![back_button("🔙 Back to categories")]])
}

pub fn back_keyboard() -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![vec![back_button("🔙 Back")]])
}

fn back_button(text: &str) -> InlineKeyboardButton {
    InlineKeyboardButton::callback(text, CallbackData::BackToCategories.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::CategoryId;
    use teloxide::types::InlineKeyboardButtonKind;

    fn category(slug: &str) -> Category {
        Category {
            id: CategoryId::new(),
            slug: slug.to_string(),
            name: slug.to_uppercase(),
            description: None,
            is_active: true,
            chats_count: 1,
            last_parsed_at: None,
        }
    }

    fn callbacks(markup: &InlineKeyboardMarkup) -> Vec<Vec<String>> {
        markup
            .inline_keyboard
            .iter()
            .map(|row| {
                row.iter()
                    .map(|b| match &b.kind {
                        InlineKeyboardButtonKind::CallbackData(data) => data.clone(),
                        other => panic!("unexpected button kind {other:?}"),
                    })
                    .collect()
            })
            .collect()
    }

    #[test]
    fn all_button_shares_row_with_odd_category() {
        let markup = categories_keyboard(&[category("web"), category("design"), category("copy")]);
        assert_eq!(
            callbacks(&markup),
            vec![vec!["cat_web", "cat_design"], vec!["cat_copy", "cat_all"]]
        );
    }

    #[test]
    fn all_button_gets_own_row_when_last_is_full() {
        let markup = categories_keyboard(&[category("web"), category("design")]);
        assert_eq!(
            callbacks(&markup),
            vec![vec!["cat_web", "cat_design"], vec!["cat_all"]]
        );
        assert_eq!(callbacks(&categories_keyboard(&[])), vec![vec!["cat_all"]]);
    }

    #[test]
    fn period_keyboard_offers_week_and_month() {
        let markup = period_keyboard(&CategorySelection::Slug("web_dev".into()));
        assert_eq!(
            callbacks(&markup),
            vec![
                vec!["period_7_web_dev", "period_30_web_dev"],
                vec!["back_to_categories"]
            ]
        );
    }

    #[test]
    fn first_page_has_only_next() {
        let markup = pagination_keyboard(&CategorySelection::All, 7, PageRequest::new(0, 5), 12);
        assert_eq!(
            callbacks(&markup),
            vec![vec!["page_info", "page_1_all_7"], vec!["back_to_categories"]]
        );
        assert_eq!(markup.inline_keyboard[0][0].text, "Page 1/3");
    }

    #[test]
    fn middle_and_last_pages() {
        let category = CategorySelection::Slug("web_dev".into());
        let middle = pagination_keyboard(&category, 30, PageRequest::new(1, 5), 12);
        assert_eq!(
            callbacks(&middle)[0],
            vec!["page_0_web_dev_30", "page_info", "page_2_web_dev_30"]
        );

        let last = pagination_keyboard(&category, 30, PageRequest::new(2, 5), 12);
        assert_eq!(callbacks(&last)[0], vec!["page_1_web_dev_30", "page_info"]);
    }
}
