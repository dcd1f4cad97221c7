//! Russian UI texts (HTML parse mode)
//!
//! Static screens are constants, screens with data are builder functions.
//! Everything that came from a user or an admin goes through [`escape_html`].

use indoc::indoc;
use itertools::Itertools;

use crate::core::config::catalog::BUDGET_THRESHOLDS;
use crate::core::text::escape_html;
use crate::storage::apartments::{Apartment, CatalogFilter, GuestRange};
use crate::storage::events::WindowStats;
use crate::storage::promo::{AssignedCode, PoolSummary};
use crate::storage::requests::{DateRequest, EntryRequest};
use crate::storage::users::CabinetSummary;

pub const MAIN_MENU: &str = "✨ <b>Главное меню</b>\nВыберите нужный раздел:";
pub const HOME: &str = "Главное меню. Выберите раздел:";

pub const HELP: &str = indoc! {"
    Помощь по боту:

    1) Откройте раздел <b>🏠 Квартиры</b> и выберите вариант.
    2) В карточке можно посмотреть фото/видео, карту и перейти к бронированию.
    3) Если хотите, нажмите <b>🤔 Не определился</b> и отправьте даты + гостей одним сообщением.
    4) В разделе <b>🎁 Промокоды</b> доступны ваши коды и реферальная ссылка.

    Важно: бронирование оформляется на сайте, не внутри Telegram-бота."};

pub const PRIVACY: &str = indoc! {"
    Политика данных:
    • Сохраняем только данные, нужные для работы бота и обработки заявок.
    • Вы можете удалить свои данные командой /delete_me."};

pub const DELETED: &str = "Ваши данные удалены.";
pub const COMMANDS_HINT: &str = "Доступные команды: /start /help /privacy /delete_me";
pub const USE_BUTTONS: &str = "Используйте кнопки меню ниже.";
pub const CONTACT_SAVED: &str = "Контакт сохранён ✅";
pub const NO_ACCESS: &str = "Нет доступа";
pub const NOT_FOUND: &str = "Не найдено";
pub const BAD_DATA: &str = "Некорректные данные";
pub const DONE: &str = "Готово";

// ---- entry date ----

pub const ENTRY_DATE_PROMPT: &str = "Напишите желаемую дату заезда в свободном формате.\n\
    Примеры: <b>с 25 марта на 3 ночи</b>, <b>апрель, 2 взрослых</b>";
pub const ENTRY_DATE_EMPTY: &str = "Не вижу текста. Напишите дату заезда одним сообщением.";

pub fn entry_date_saved() -> String {
    format!("Супер, дату зафиксировали ✅\n\n{MAIN_MENU}")
}

// ---- catalog ----

pub const CATALOG: &str = "Каталог квартир. Выберите вариант ниже.";
pub const CATALOG_EMPTY: &str = "По выбранным фильтрам квартир нет. Измените фильтры или сбросьте их.";
pub const THROTTLED: &str = "Слишком быстро, попробуйте ещё раз.";
pub const APARTMENT_NOT_FOUND: &str = "Квартира не найдена";
pub const MEDIA_EMPTY: &str = "Медиа пока не добавлены";

pub const FILTERS_OPEN: &str = "Настройте фильтры:\n\n";
pub const FILTERS_GUESTS: &str = "Фильтр по гостям обновлён.\n\n";
pub const FILTERS_BUDGET: &str = "Фильтр по бюджету обновлён.\n\n";
pub const FILTERS_TAGS: &str = "Фильтр по тегам обновлён.\n\n";
pub const FILTERS_RESET: &str = "Фильтры сброшены.\n\n";
pub const FILTERS_RESET_ANSWER: &str = "Сброшено";

fn guests_label(range: Option<GuestRange>) -> &'static str {
    match range {
        Some(GuestRange::UpToTwo) => "До 2 гостей",
        Some(GuestRange::UpToFour) => "До 4 гостей",
        Some(GuestRange::FiveAndMore) => "5 и более гостей",
        None => "любой вариант",
    }
}

/// Текущие фильтры; строка про бюджет есть только если пороги настроены
pub fn filter_summary(filter: &CatalogFilter) -> String {
    let tags = if filter.tags.is_empty() {
        "нет".to_string()
    } else {
        filter.tags.iter().join(", ")
    };
    let mut out = format!(
        "Текущие фильтры:\n• Гости: {}\n• Теги: {}",
        guests_label(filter.guests),
        escape_html(&tags)
    );
    if !BUDGET_THRESHOLDS.is_empty() {
        let budget = filter
            .budget
            .map(|b| format!("до {b}"))
            .unwrap_or_else(|| "любой".to_string());
        out.push_str(&format!("\n• Бюджет: {budget}"));
    }
    out.push_str("\n\nПодсказка: фильтр гостей ищет квартиры по вместимости (максимум гостей).");
    out
}

fn body_blocks(apt: &Apartment) -> String {
    let short = apt.details.short_desc.trim();
    let short = if short.is_empty() { apt.amenities.trim() } else { short };
    let mut out = format!("<b><u>{}</u></b>", escape_html(apt.header_text()));
    if !short.is_empty() {
        out.push_str(&format!("\n\n{}", escape_html(short)));
    }
    let quote = apt.details.quote_desc.trim();
    if !quote.is_empty() {
        out.push_str(&format!("\n\n<blockquote>{}</blockquote>", escape_html(quote)));
    }
    let features = apt.details.features_text.trim();
    if !features.is_empty() {
        out.push_str(&format!(
            "\n\n<b>Что есть в квартире</b>\n<blockquote>{}</blockquote>",
            escape_html(features)
        ));
    }
    out
}

/// Карточка квартиры в боте
pub fn apartment_card(apt: &Apartment) -> String {
    let mut out = body_blocks(apt);
    if !apt.tags.is_empty() {
        out.push_str(&format!("\n\n🏷 {}", escape_html(&apt.tags.join(", "))));
    }
    out.push_str("\n\n<b>Забронировать эту квартиру</b>\n⬇️ Нажмите кнопку ниже");
    out
}

/// Пост квартиры для канала
pub fn apartment_post(apt: &Apartment) -> String {
    let mut out = body_blocks(apt);
    if !apt.tags.is_empty() {
        out.push_str(&format!("\n\n🏷 Теги: {}", escape_html(&apt.tags.join(", "))));
    }
    if !apt.map_url.is_empty() {
        out.push_str(&format!(
            "\n\n🗺 <a href=\"{}\">Открыть карту</a>",
            escape_html(&apt.map_url)
        ));
    }
    out.push_str("\n\n<b>Забронировать эту квартиру</b>\n⬇️ Нажмите кнопку ниже");
    out
}

pub fn media_caption(title: &str, index: usize, count: usize) -> String {
    format!("🖼 <b>{}</b>\nФото {}/{}", escape_html(title), index + 1, count)
}

pub fn media_link_fallback(caption: &str) -> String {
    format!("{caption}\nОткройте медиа по ссылке ниже.")
}

// ---- booking ----

pub const BOOK_APARTMENT: &str = "Бронирование проходит на сайте. Нажмите кнопку ниже:";
pub const BOOK_APARTMENT_ANSWER: &str = "Переходим к бронированию";
pub const BOOKING: &str = "Бронирование не внутри бота. Мы откроем сайт с актуальными слотами и ценами.";
pub const BOOKING_LOGGED: &str = "Учтено ✅";

pub const DATES_PROMPT: &str = indoc! {"
    Напишите, когда примерно хотите заехать (в свободном формате).

    Как написать:
    • Период проживания
    • Сколько взрослых/детей
    • Доп. пожелания (по желанию)

    Пример: <b>20.03–23.03, 2 взрослых + 1 ребёнок, нужна парковка</b>"};
pub const DATES_SENT: &str = "Спасибо! Передали заявку администратору.";

pub const RULES: &str = indoc! {"
    📘 <b>Правила бронирования</b>

    <blockquote>1) Выберите квартиру и посмотрите фото/видео в карточке.</blockquote>
    <blockquote>2) Нажмите «📅 Забронировать», и откроется сайт с актуальными датами.</blockquote>
    <blockquote>3) Если пока не определились, нажмите «🤔 Не определился» и напишите желаемые даты в свободном формате.</blockquote>

    <b>Важно:</b> бронирование оформляется на сайте, а бот помогает быстро подобрать вариант и передать заявку администратору."};

// ---- promo, cabinet, giveaway ----

pub const PROMO_MENU: &str = indoc! {"
    Раздел промокодов:
    • <b>🎁 Получить welcome</b>: один раз на пользователя (если есть в пуле).
    • <b>🔗 Реферальная ссылка</b>: чтобы приглашать друзей.
    • <b>📦 Мои промокоды</b>: все выданные вам коды."};
pub const WELCOME_ALREADY: &str = "Вы уже получали welcome-код";
pub const WELCOME_EMPTY: &str = "Сейчас welcome-коды закончились";
pub const NO_CODES: &str = "У вас пока нет выданных промокодов.";

pub fn welcome_code(code: &str) -> String {
    format!("Ваш welcome промокод: <b>{}</b>", escape_html(code))
}

pub fn referral_link(bot_username: &str, ref_code: &str) -> String {
    format!("https://t.me/{bot_username}?start=ref_{ref_code}")
}

pub fn referral_message(link: &str) -> String {
    format!("Ваша реферальная ссылка:\n{link}")
}

pub fn my_codes(codes: &[AssignedCode]) -> String {
    if codes.is_empty() {
        return NO_CODES.to_string();
    }
    let lines = codes
        .iter()
        .map(|c| format!("• {} ({})", escape_html(&c.code), c.kind))
        .join("\n");
    format!("Ваши промокоды:\n{lines}")
}

pub fn cabinet(link: &str, summary: &CabinetSummary) -> String {
    format!(
        "Личный кабинет:\n• Ваша ссылка: {link}\n• Приглашено: {}\n• Квалифицировано: {}\n• Ваших промокодов: {}",
        summary.invited, summary.qualified, summary.codes
    )
}

pub const GIVEAWAY_INTRO: &str = "Розыгрыш: нажмите кнопку ниже, чтобы участвовать.";
pub const GIVEAWAY_ALREADY: &str = "Вы уже участвуете в розыгрыше ✅";
pub const GIVEAWAY_JOINED: &str = "✅ Вы участвуете";
pub const GIVEAWAY_JOINED_ANSWER: &str = "Участие подтверждено";
pub const GIVEAWAY_ALREADY_ANSWER: &str = "Вы уже в списке участников";

pub fn referral_reward(code: &str) -> String {
    format!(
        "🎉 Ваш друг присоединился по вашей ссылке! Ваш промокод: <b>{}</b>",
        escape_html(code)
    )
}

// ---- reminders ----

pub const REMINDER: &str = "Давно не виделись 👋\nПосмотрите актуальные варианты квартир.";
pub const REMINDERS_OFF: &str = "Напоминания отключены.";
pub const REMINDERS_OFF_ANSWER: &str = "Напоминания отключены";

// ---- replies between admin and user ----

pub const USER_REPLY_PROMPT: &str =
    "Напишите ответ администратору одним сообщением.\nЭто сообщение не удаляется автоматически.";
pub const USER_REPLY_EMPTY: &str = "Не вижу текста. Напишите ответ одним сообщением.";
pub const USER_REPLY_SENT: &str = "Спасибо, ваш ответ передан администратору ✅";

pub fn admin_answer(text: &str) -> String {
    format!("Ответ администратора:\n{}", escape_html(text))
}

/// Who wrote: `Имя (@username)\nID: 123`
pub fn user_line(full_name: &str, username: Option<&str>, user_id: i64) -> String {
    format!(
        "Пользователь: {} (@{})\nID: {}",
        escape_html(full_name),
        escape_html(username.unwrap_or("-")),
        user_id
    )
}

pub fn new_entry_request(id: i64, user: &str, raw: &str) -> String {
    format!("🗓 Новая дата на старте\nЗаявка: #{id}\n{user}\nТекст: {}", escape_html(raw))
}

pub fn new_date_request(id: i64, apartment: &str, raw: &str, user: &str, user_id: i64) -> String {
    format!(
        "Новая заявка #{id}\nКвартира: {}\nТекст: {}\n{user}\nСсылка: tg://user?id={user_id}",
        escape_html(apartment),
        escape_html(raw)
    )
}

pub fn user_reply_to_admin(user: &str, kind_label: &str, request_id: i64, text: &str, original: Option<&str>) -> String {
    let mut out = format!(
        "💬 Ответ от пользователя\n{user}\nТип заявки: {kind_label}\nЗаявка: #{request_id}\nТекст ответа: {}",
        escape_html(text)
    );
    if let Some(original) = original {
        let label = if kind_label == "entry_date" {
            "Изначальная заявка (старт)"
        } else {
            "Изначальная заявка"
        };
        out.push_str(&format!("\n{label}: {}", escape_html(original)));
    }
    out
}

// ==================== admin ====================

pub const ADMIN_MENU: &str = "Админ-панель:";
pub const ADMIN_APARTMENTS: &str = indoc! {"
    Управление квартирами:
    • Добавьте новую квартиру
    • Откройте список и отредактируйте нужные поля
    • Фото/видео загружайте прямо в мастере, затем публикуйте в канал кнопкой «📤 В канал»"};
pub const APARTMENT_LIST: &str = "Список квартир:";
pub const STATUS_CHANGED: &str = "Статус изменён";
pub const FIELD_UPDATED: &str = "Обновлено ✅";
pub const POST_PREVIEW: &str = "📣 Предпросмотр поста для канала:\n(кнопки внизу уже как в публикации)";
pub const POST_PREVIEW_SENT: &str = "Предпросмотр отправлен";
pub const PUBLISHED: &str = "Опубликовано в канал ✅";
pub const PUBLISH_FAILED: &str = "Не удалось отправить в канал";
pub const NO_CHANNEL: &str = "Не задан CHANNEL_ID";
pub const BAD_URL: &str = "Нужна ссылка, начинающаяся с http:// или https://";

pub fn apartment_admin(apt: &Apartment) -> String {
    let status = if apt.is_active { "🟢 в каталоге" } else { "⚫️ скрыта" };
    format!(
        "Редактирование квартиры #{}\n{}\nСтатус: {status}\nПорядок: {}",
        apt.id,
        escape_html(&apt.title),
        apt.sort_order
    )
}

pub fn field_prompt(field: &str, example: &str) -> String {
    format!("Редактирование поля <b>{field}</b>.\nОтправьте новое значение одним сообщением.\n{example}")
}

// ---- requests ----

pub const REQUESTS_TITLE: &str = "Заявки (последние 20):";
pub const REQUEST_NOT_FOUND: &str = "Заявка не найдена";
pub const REQUEST_DONE: &str = "Помечено обработанным";
pub const REPLY_PROMPT: &str = indoc! {"
    Введите ответ пользователю одним сообщением.
    Пример:
    Добрый день! Свободно с 20.03 по 23.03.
    Для подтверждения нажмите «Забронировать» в карточке квартиры."};
pub const ENTRY_REPLY_PROMPT: &str = "Введите ответ пользователю по заявке «дата на старте» одним сообщением.";
pub const REPLY_SENT: &str = "Ответ отправлен ✅";
pub const ENTRY_DATES_EMPTY: &str = "Пока нет дат, оставленных на входе.";
pub const ENTRY_DATES_TITLE: &str = "🗓 Последние даты на старте:\n\nВыберите заявку для ответа:";

fn status_label(is_new: bool) -> &'static str {
    if is_new { "🆕 новая" } else { "✅ обработана" }
}

pub fn date_request_details(req: &DateRequest, apartment_title: Option<&str>) -> String {
    format!(
        "Заявка #{}\nСтатус: {}\nКвартира: {}\nПользователь: {}\nТекст: {}",
        req.id,
        status_label(req.is_new()),
        escape_html(apartment_title.unwrap_or(&req.apartment_id.to_string())),
        req.user_id,
        escape_html(&req.raw_text)
    )
}

pub fn entry_request_details(req: &EntryRequest) -> String {
    format!(
        "Заявка старта #{}\nСтатус: {}\nПользователь: {}\nТекст: {}",
        req.id,
        status_label(req.is_new()),
        req.user_id,
        escape_html(&req.raw_text)
    )
}

pub const PROMO_PICK: &str = "Выберите код или введите вручную:";
pub const CODE_TAKEN: &str = "Код уже занят";
pub const PROMO_GIVEN: &str = "Промокод выдан ✅";
pub const PROMO_MANUAL_PROMPT: &str = "Введите промокод вручную одним сообщением.\nПример: <b>SPRING-15</b>";
pub const PROMO_SENT: &str = "Промокод отправлен пользователю ✅";
pub const NO_ACTIVE_REQUEST: &str = "Нет активной заявки";

pub fn promo_for_user(code: &str) -> String {
    format!("Вам выдан промокод: <b>{}</b>", escape_html(code))
}

// ---- promo codes ----

pub const ADMIN_CODES: &str = indoc! {"
    Управление промокодами:
    • <b>➕ Добавить код</b>: добавить один код с типом
    • <b>📥 Bulk загрузка</b>: вставить много кодов списком
    • <b>🧾 Список по типу</b>: посмотреть остатки"};
pub const CODE_ADD_PROMPT: &str = indoc! {"
    Добавление одного промокода:

    Отправьте 1 строку в формате <b>КОД|ТИП</b>.
    Доступные типы: <b>welcome</b>, <b>giveaway</b>, <b>manual</b>, <b>referral_reward</b>.

    Примеры:
    • WELCOME100|welcome
    • GIFT-APRIL-10|manual
    • LUCKY777|giveaway"};
pub const CODE_ADD_FORMAT: &str = "Неверный формат.\nИспользуйте: <b>КОД|ТИП</b>\nПример: <b>SAVE10|manual</b>";
pub const CODE_ADDED: &str = "Код добавлен ✅";
pub const CODE_BULK_PROMPT: &str = indoc! {"
    Массовая загрузка промокодов:

    Шаг 1. В первой строке укажите тип.
    Шаг 2. Ниже вставьте коды, каждый с новой строки.

    Пример сообщения:
    manual
    APRIL-100
    APRIL-200
    APRIL-300"};
pub const CODE_BULK_FORMAT: &str = "Нужно минимум 2 строки: тип + хотя бы один код.\nПример:\nmanual\nCODE1";
pub const CODES_EMPTY: &str = "Промокодов пока нет.";

pub fn code_error(err: &str) -> String {
    format!("Ошибка: {}", escape_html(err))
}

pub fn codes_loaded(count: usize) -> String {
    format!("Загружено кодов: {count}")
}

pub fn pool_summary(pools: &[PoolSummary]) -> String {
    if pools.is_empty() {
        return CODES_EMPTY.to_string();
    }
    let lines = pools
        .iter()
        .map(|p| format!("• {}: всего {}, свободно {}", p.kind, p.total, p.free))
        .join("\n");
    format!("Пулы промокодов:\n{lines}")
}

// ---- giveaway ----

pub const DRAW_NO_CODE: &str = "Нет свободных giveaway-кодов";
pub const DRAW_NO_PARTICIPANTS: &str = "Нет участников";
pub const DRAW_DONE: &str = "Победитель выбран ✅";

pub fn giveaway_admin(participants: i64) -> String {
    format!("Участников в розыгрыше: {participants}")
}

pub fn giveaway_winner(code: &str) -> String {
    format!(
        "🏆 Поздравляем! Вы победили в розыгрыше. Ваш промокод: <b>{}</b>",
        escape_html(code)
    )
}

pub fn giveaway_channel(name: &str) -> String {
    format!("🏆 Победитель розыгрыша: {}! Поздравляем! 🎉", escape_html(name))
}

// ---- stats ----

fn window_block(days: i64, stats: &WindowStats) -> String {
    format!(
        "Статистика {days} дней:\n• Новые: {}\n• Активные: {}\n• Клики бронирования: {}\n• Заявки: {}",
        stats.new_users, stats.active_users, stats.clicks, stats.requests
    )
}

pub fn stats(week: &WindowStats, month: &WindowStats, top: &[(i64, i64)]) -> String {
    let top = if top.is_empty() {
        "нет".to_string()
    } else {
        top.iter().map(|(id, cnt)| format!("#{id} ({cnt})")).join(", ")
    };
    format!(
        "{}\n\n{}\n• Топ квартир (30д): {top}",
        window_block(7, week),
        window_block(30, month)
    )
}

// ---- broadcast ----

pub const BROADCAST_SEGMENTS: &str = "Выберите сегмент рассылки:";
pub const BROADCAST_PROMPT: &str = indoc! {"
    Введите текст рассылки одним сообщением.
    Можно использовать переносы строк и эмодзи.

    Пример:
    🏠 Новые квартиры уже в каталоге!
    Откройте раздел «Квартиры» и выберите подходящий вариант."};
pub const BROADCAST_NO_DATA: &str = "Нет данных для рассылки";

pub fn broadcast_confirm(text: &str) -> String {
    format!("Проверьте текст рассылки:\n\n{text}\n\nОтправить выбранному сегменту?")
}

pub fn broadcast_done(sent: usize) -> String {
    format!("Рассылка завершена. Отправлено: {sent}")
}

// ---- channel tools ----

pub const CATALOG_BUTTON_INTRO: &str = indoc! {"
    🟢 Закреплённый пост с одной кнопкой «Бронь»

    Сценарий:
    1) Нажмите кнопку ниже: бот отправит пост в канал и закрепит его.
    2) В этом закрепе будет большая зелёная кнопка «Бронь».
    3) Саму кнопку «Каталог» оставляйте в основном посте-каталоге.

    Итог: в закрепе быстрый переход на бронь, в посте кнопка каталога."};
pub const CATALOG_BUTTON_POST: &str = "Быстрое бронирование квартиры по кнопке ниже 👇";

pub fn catalog_button_published(pinned: bool) -> String {
    let pin = if pinned {
        "И закреплён вверху канала ✅\n"
    } else {
        "Не удалось закрепить автоматически (проверьте права бота на закрепление).\n"
    };
    format!("Закреп с кнопкой «Бронь» опубликован ✅\n{pin}Каталог-кнопку оставляйте в основном посте-каталоге.")
}

pub const CATALOG_ONLY_INTRO: &str = indoc! {"
    📚 Отдельная кнопка «Каталог»

    Сценарий:
    1) Нажмите «Опубликовать кнопку Каталог».
    2) Если нужно, позже обновите ссылку через «Обновить ссылку Каталог».

    Это отдельный пост, не закреплённый. Закреп с кнопкой «Бронь» работает отдельно."};
pub const CATALOG_ONLY_POST: &str = "Откройте каталог квартир по кнопке ниже 👇";
pub const CATALOG_ONLY_PUBLISHED: &str =
    "Пост с кнопкой «Каталог» опубликован ✅\nЕсли ссылка изменится, нажмите «Обновить ссылку Каталог».";
pub const CATALOG_LINK_PROMPT: &str = "Отправьте ссылку на пост-каталог.\nПример: https://t.me/your_channel/123";
pub const CATALOG_LINK_NOT_PUBLISHED: &str = "Сначала нажмите «Опубликовать кнопку Каталог».";
pub const CATALOG_LINK_MISSING: &str = "Не нашёл сохранённый пост-кнопку. Опубликуйте его заново.";
pub const CATALOG_LINK_UPDATED: &str = "Ссылка на кнопку «Каталог» обновлена ✅";

pub fn catalog_link_failed(err: &str) -> String {
    format!("Не удалось обновить кнопку: {}", escape_html(err))
}

pub const CHANNEL_POST_STEP1: &str = indoc! {"
    📣 Конструктор поста в канал

    Шаг 1/2: отправьте фото/видео (можно несколько сообщений).
    Когда закончите, нажмите «✅ Готово, к тексту»."};
pub const CHANNEL_POST_NEED_MEDIA: &str = "Нужны фото/видео. Отправьте файл и продолжайте.";
pub const CHANNEL_POST_NO_MEDIA: &str = "Добавьте хотя бы одно фото/видео";
pub const CHANNEL_POST_STEP2: &str = "Шаг 2/2: отправьте текст поста одним сообщением.";
pub const CHANNEL_POST_EMPTY: &str = "Текст пустой. Отправьте текст поста.";
pub const CHANNEL_POST_INCOMPLETE: &str = "Не хватает медиа или текста";
pub const CHANNEL_POST_FAILED: &str = "Не удалось опубликовать";
pub const CHANNEL_POST_DONE: &str = "Пост опубликован в канал ✅";
pub const CHANNEL_POST_CANCELLED: &str = "Публикация отменена.";

pub fn channel_post_media_added(count: usize) -> String {
    format!("Добавлено медиа: {count}")
}

pub fn channel_post_preview(text: &str) -> String {
    format!("Предпросмотр текста:\n\n{text}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::apartments::ApartmentDetails;
    use pretty_assertions::assert_eq;

    fn apartment() -> Apartment {
        Apartment {
            id: 1,
            title: "ЖК Панорама".to_string(),
            address_short: "ул. Героев".to_string(),
            guests_max: 4,
            amenities: "Уютно".to_string(),
            tags: vec!["тихо".to_string(), "парковка".to_string()],
            price_from: 0,
            channel_post_url: String::new(),
            map_url: "https://maps.example/?q=1&z=2".to_string(),
            is_active: true,
            sort_order: 0,
            created_at: String::new(),
            details: ApartmentDetails {
                header_text: Some("ЖК <Панорама>".to_string()),
                short_desc: String::new(),
                quote_desc: "Тихий двор".to_string(),
                features_text: "Wi-Fi".to_string(),
                media_items: vec![],
            },
            media_urls: vec![],
        }
    }

    #[test]
    fn test_card_escapes_and_orders_blocks() {
        let card = apartment_card(&apartment());
        assert_eq!(
            card,
            "<b><u>ЖК &lt;Панорама&gt;</u></b>\n\nУютно\n\n<blockquote>Тихий двор</blockquote>\n\n\
             <b>Что есть в квартире</b>\n<blockquote>Wi-Fi</blockquote>\n\n🏷 тихо, парковка\n\n\
             <b>Забронировать эту квартиру</b>\n⬇️ Нажмите кнопку ниже"
        );
    }

    #[test]
    fn test_post_has_map_link() {
        let post = apartment_post(&apartment());
        assert!(post.contains("🏷 Теги: тихо, парковка"));
        assert!(post.contains("<a href=\"https://maps.example/?q=1&amp;z=2\">Открыть карту</a>"));
    }

    #[test]
    fn test_filter_summary_defaults() {
        let summary = filter_summary(&CatalogFilter::default());
        assert!(summary.starts_with("Текущие фильтры:\n• Гости: любой вариант\n• Теги: нет"));
    }

    #[test]
    fn test_filter_summary_sorted_tags() {
        let mut filter = CatalogFilter {
            guests: Some(GuestRange::FiveAndMore),
            ..Default::default()
        };
        filter.toggle_tag("тихо");
        filter.toggle_tag("видовая");
        let summary = filter_summary(&filter);
        assert!(summary.contains("• Гости: 5 и более гостей"));
        assert!(summary.contains("• Теги: видовая, тихо"));
    }

    #[test]
    fn test_stats_text() {
        let week = WindowStats { new_users: 1, active_users: 2, clicks: 3, requests: 4 };
        let text = stats(&week, &week, &[(7, 3), (2, 1)]);
        assert!(text.starts_with("Статистика 7 дней:\n• Новые: 1"));
        assert!(text.contains("Статистика 30 дней:"));
        assert!(text.ends_with("• Топ квартир (30д): #7 (3), #2 (1)"));
        assert!(stats(&week, &week, &[]).ends_with("нет"));
    }

    #[test]
    fn test_my_codes_list() {
        assert_eq!(my_codes(&[]), NO_CODES);
        let codes = vec![AssignedCode {
            code: "W1".to_string(),
            kind: "welcome".to_string(),
            assigned_at: None,
        }];
        assert_eq!(my_codes(&codes), "Ваши промокоды:\n• W1 (welcome)");
    }

    #[test]
    fn test_user_reply_to_admin_labels_original() {
        let user = user_line("Анна", None, 5);
        let text = user_reply_to_admin(&user, "entry_date", 3, "ок", Some("апрель"));
        assert!(text.contains("Пользователь: Анна (@-)\nID: 5"));
        assert!(text.ends_with("Изначальная заявка (старт): апрель"));
    }

    #[test]
    fn test_referral_link() {
        assert_eq!(referral_link("rent_bot", "u1a2b"), "https://t.me/rent_bot?start=ref_u1a2b");
    }
}
