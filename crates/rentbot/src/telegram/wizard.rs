//! Step-by-step apartment wizard for admins
//!
//! The wizard walks through [`STEPS`] in order. After the last step it sits in
//! preview mode until the admin saves, restarts or cancels.

use mime::Mime;

use crate::core::text::{escape_html, first_line, truncate_chars};
use crate::storage::apartments::{
    is_http_url, parse_tags, Apartment, ApartmentDetails, ApartmentDraft, MediaItem, MediaKind,
};

/// How the answer to a step is entered and validated
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepKind {
    MediaUpload,
    Text,
    Int,
    Url,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepKey {
    MediaItems,
    HeaderText,
    ShortDesc,
    QuoteDesc,
    FeaturesText,
    GuestsMax,
    Tags,
    MapUrl,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WizardStep {
    pub key: StepKey,
    pub kind: StepKind,
    pub label: &'static str,
    pub example: &'static str,
}

pub static STEPS: [WizardStep; 8] = [
    WizardStep {
        key: StepKey::MediaItems,
        kind: StepKind::MediaUpload,
        label: "Загрузите все фото/видео для карусели",
        example: "Отправьте 1+ медиа файла. Затем нажмите «✅ Завершить медиа».",
    },
    WizardStep {
        key: StepKey::HeaderText,
        kind: StepKind::Text,
        label: "Заголовок объявления (будет выделен жирным и подчёркнутым)",
        example: "ЖК Панорама, ул. Героев Сарабеева, 5к1\n1-к квартира для 2-4 гостей",
    },
    WizardStep {
        key: StepKey::ShortDesc,
        kind: StepKind::Text,
        label: "Короткое описание",
        example: "Уютная квартира рядом с парком и удобным выездом в центр.",
    },
    WizardStep {
        key: StepKey::QuoteDesc,
        kind: StepKind::Text,
        label: "Текст в цитате (рамке) под описанием",
        example: "Тихий двор, быстрый Wi‑Fi, бесконтактное заселение.",
    },
    WizardStep {
        key: StepKey::FeaturesText,
        kind: StepKind::Text,
        label: "Что есть в квартире (тоже в цитате)",
        example: "Двуспальная кровать, кондиционер, стиральная машина, кухня.",
    },
    WizardStep {
        key: StepKey::GuestsMax,
        kind: StepKind::Int,
        label: "Максимум гостей (цифрой)",
        example: "4",
    },
    WizardStep {
        key: StepKey::Tags,
        kind: StepKind::Text,
        label: "Теги для фильтров (через запятую)",
        example: "парковка,видовая,тихо,для семьи",
    },
    WizardStep {
        key: StepKey::MapUrl,
        kind: StepKind::Url,
        label: "Ссылка на карту",
        example: "https://maps.google.com/?q=55.75,37.61",
    },
];

pub const EMPTY_VALUE: &str = "Пустое значение. Введите текст или нажмите «Отменить мастер».";
pub const NOT_A_NUMBER: &str = "Нужно ввести целое число. Пример: 3500";
pub const NOT_A_URL: &str = "Нужна ссылка, начинающаяся с http:// или https://";
pub const NO_MEDIA_IN_MESSAGE: &str = "Пришлите фото/видео файлом или ссылки (по одной в строке).";
pub const NOT_MEDIA_STEP: &str = "Сейчас не этап медиа";
pub const MEDIA_SAVED: &str = "Медиа сохранены";
pub const SAVED: &str = "Сохранено";
pub const STOPPED: &str = "Мастер остановлен.";
pub const RESTARTED: &str = "Начинаем заново 👌";
pub const CANCELLED: &str = "Добавление квартиры отменено.";
pub const INACTIVE: &str = "Мастер неактивен";

pub const ADD_INTRO: &str = "🧩 <b>Мастер добавления квартиры</b>\n\n\
    Короткий сценарий:\n\
    1) загрузка фото/видео\n\
    2) заголовок объявления (жирный + подчёркнутый)\n\
    3) короткое описание\n\
    4) описание в цитате\n\
    5) что есть в квартире (цитата)\n\
    6) максимум гостей\n\
    7) теги для фильтров (парковка, видовая, тихо, для семьи)\n\
    8) ссылка на карту\n\n\
    В конце будет красивый предпросмотр и сохранение.";

pub const EDIT_INTRO: &str = "🧩 <b>Мастер редактирования квартиры</b>\n\n\
    Откройте шаги и при необходимости измените значения.\n\
    В конце будет предпросмотр и сохранение в существующую карточку.";

/// Validated answer to a text-like step
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepValue {
    Text(String),
    Int(i64),
}

/// Checks raw admin input against the step kind.
pub fn validate_step_input(kind: StepKind, raw: &str) -> Result<StepValue, &'static str> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(EMPTY_VALUE);
    }
    match kind {
        StepKind::Int => {
            if !raw.chars().all(|c| c.is_ascii_digit()) {
                return Err(NOT_A_NUMBER);
            }
            raw.parse().map(StepValue::Int).map_err(|_| NOT_A_NUMBER)
        }
        StepKind::Url if !is_http_url(raw) => Err(NOT_A_URL),
        _ => Ok(StepValue::Text(raw.to_string())),
    }
}

/// Media kind of an uploaded document by its MIME type
pub fn media_kind_for_mime(mime: Option<&Mime>) -> MediaKind {
    match mime.map(Mime::type_) {
        Some(kind) if kind == mime::IMAGE => MediaKind::Photo,
        Some(kind) if kind == mime::VIDEO => MediaKind::Video,
        _ => MediaKind::Document,
    }
}

/// Every http(s) line of a message becomes a url media item
pub fn media_from_text(text: &str) -> Vec<MediaItem> {
    text.lines()
        .map(str::trim)
        .filter(|line| is_http_url(line))
        .map(|line| MediaItem::new(MediaKind::Url, line))
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WizardMode {
    Add,
    Edit(i64),
}

/// Answers collected so far
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WizardData {
    pub mode: WizardMode,
    /// Index into [`STEPS`]; `STEPS.len()` means preview
    pub step: usize,
    pub media_items: Vec<MediaItem>,
    pub header_text: String,
    pub short_desc: String,
    pub quote_desc: String,
    pub features_text: String,
    pub guests_max: Option<i64>,
    pub tags: String,
    pub map_url: String,
    pub sort_order: i64,
    // kept as is when editing
    pub price_from: i64,
    pub channel_post_url: String,
}

impl WizardData {
    pub fn new_add() -> Self {
        Self {
            mode: WizardMode::Add,
            step: 0,
            media_items: Vec::new(),
            header_text: String::new(),
            short_desc: String::new(),
            quote_desc: String::new(),
            features_text: String::new(),
            guests_max: None,
            tags: String::new(),
            map_url: String::new(),
            sort_order: 0,
            price_from: 0,
            channel_post_url: String::new(),
        }
    }

    /// Предзаполняет мастер значениями существующей квартиры
    pub fn from_apartment(apt: &Apartment) -> Self {
        Self {
            mode: WizardMode::Edit(apt.id),
            step: 0,
            media_items: apt.media_items(),
            header_text: apt.header_text().to_string(),
            short_desc: apt.details.short_desc.clone(),
            quote_desc: apt.details.quote_desc.clone(),
            features_text: apt.details.features_text.clone(),
            guests_max: Some(apt.guests_max),
            tags: apt.tags.join(","),
            map_url: apt.map_url.clone(),
            sort_order: apt.sort_order,
            price_from: apt.price_from,
            channel_post_url: apt.channel_post_url.clone(),
        }
    }

    pub fn current_step(&self) -> Option<&'static WizardStep> {
        STEPS.get(self.step)
    }

    pub fn in_preview(&self) -> bool {
        self.step >= STEPS.len()
    }

    pub fn is_media_step(&self) -> bool {
        self.current_step().is_some_and(|s| s.kind == StepKind::MediaUpload)
    }

    pub fn advance(&mut self) {
        self.step = (self.step + 1).min(STEPS.len());
    }

    /// Validates and stores the answer to the current text step, then advances.
    pub fn apply_text(&mut self, raw: &str) -> Result<(), &'static str> {
        let Some(step) = self.current_step() else {
            return Ok(());
        };
        if step.kind == StepKind::MediaUpload {
            return Err(NO_MEDIA_IN_MESSAGE);
        }
        let value = validate_step_input(step.kind, raw)?;
        match (step.key, value) {
            (StepKey::GuestsMax, StepValue::Int(n)) => self.guests_max = Some(n),
            (key, StepValue::Text(text)) => match key {
                StepKey::HeaderText => self.header_text = text,
                StepKey::ShortDesc => self.short_desc = text,
                StepKey::QuoteDesc => self.quote_desc = text,
                StepKey::FeaturesText => self.features_text = text,
                StepKey::Tags => self.tags = text,
                StepKey::MapUrl => self.map_url = text,
                StepKey::MediaItems | StepKey::GuestsMax => {}
            },
            _ => {}
        }
        self.advance();
        Ok(())
    }

    pub fn add_media(&mut self, items: impl IntoIterator<Item = MediaItem>) -> usize {
        let before = self.media_items.len();
        self.media_items.extend(items);
        self.media_items.len() - before
    }

    /// Начать заново: add-режим очищается, edit перечитывается снаружи
    pub fn restart(&mut self) {
        *self = Self::new_add();
    }

    pub fn to_draft(&self) -> ApartmentDraft {
        let header = self.header_text.trim();
        let first = first_line(header);
        let title = if first.is_empty() { "Квартира" } else { first };
        let address = if first.is_empty() { "Адрес не указан" } else { first };
        let short_desc = self.short_desc.trim().to_string();

        ApartmentDraft {
            title: truncate_chars(title, 80, "..."),
            address_short: truncate_chars(address, 120, "..."),
            guests_max: self.guests_max.map(|n| n.max(1)).unwrap_or(2),
            amenities: short_desc.chars().take(180).collect(),
            tags: parse_tags(&self.tags),
            price_from: self.price_from,
            channel_post_url: self.channel_post_url.clone(),
            map_url: self.map_url.trim().to_string(),
            sort_order: self.sort_order,
            details: ApartmentDetails {
                header_text: Some(header.to_string()),
                short_desc,
                quote_desc: self.quote_desc.trim().to_string(),
                features_text: self.features_text.trim().to_string(),
                media_items: self.media_items.clone(),
            },
        }
    }

    /// Prompt for the current step, `None` in preview
    pub fn step_prompt(&self) -> Option<String> {
        let step = self.current_step()?;
        let mut text = format!(
            "<b>Шаг {}/{}</b>\nРаздел: {}/{}\n\n",
            self.step + 1,
            STEPS.len(),
            self.step + 1,
            STEPS.len()
        );
        match step.kind {
            StepKind::MediaUpload => {
                text.push_str(&format!(
                    "Сейчас укажите: <b>{}</b>\n\
                     Отправляйте фото/видео файлами прямо в чат.\n\
                     Можно также отправить ссылки (каждая с новой строки).\n\
                     Уже добавлено: <b>{}</b>\n\n\
                     Когда закончите, нажмите «✅ Завершить медиа».",
                    step.label,
                    self.media_items.len()
                ));
            }
            _ => {
                text.push_str(&format!("Сейчас укажите: <b>{}</b>\nВведите значение текстом.", step.label));
                if step.key == StepKey::HeaderText {
                    text.push_str("\n\nЭтот блок будет показан в карточке как <b><u>заголовок объявления</u></b>.");
                }
                text.push_str(&format!("\nПример: <b>{}</b>", step.example));
            }
        }
        Some(text)
    }

    pub fn preview_text(&self) -> String {
        let guests = self.guests_max.map(|g| g.to_string()).unwrap_or_default();
        format!(
            "🏠 <b>Предпросмотр карточки/поста</b>\n\n\
             <b>Верхний блок</b>\n{}\n\n\
             <b>Описание</b>\n{}\n\n\
             <blockquote>{}</blockquote>\n\n\
             <b>Что есть в квартире</b>\n<blockquote>{}</blockquote>\n\n\
             <b>Публикация</b>\n\
             • Максимум гостей: {}\n\
             • Теги: {}\n\
             • Медиа-файлов/ссылок: {}\n\
             • Ссылка на карту: {}\n\
             • Порядок: {}",
            escape_html(&self.header_text),
            escape_html(&self.short_desc),
            escape_html(&self.quote_desc),
            escape_html(&self.features_text),
            guests,
            escape_html(&self.tags),
            self.media_items.len(),
            escape_html(&self.map_url),
            self.sort_order
        )
    }

    pub fn saved_text(&self) -> String {
        let head = match self.mode {
            WizardMode::Add => "Квартира добавлена ✅",
            WizardMode::Edit(_) => "Квартира обновлена ✅",
        };
        format!("{head}\nТекст предпросмотра можно использовать как готовое описание для поста в канале.")
    }
}
