//! Inline keyboards for every screen
//!
//! All builders are pure: they take plain data and return an
//! [`InlineKeyboardMarkup`]. Every user-facing keyboard ends with the
//! navigation row from [`nav`].

use teloxide::types::{InlineKeyboardButton, InlineKeyboardMarkup};
use url::Url;

use crate::core::config::catalog::{BUDGET_THRESHOLDS, FILTER_TAGS};
use crate::core::contacts::ManagerContacts;
use crate::storage::apartments::{page_count, Apartment, ApartmentField, CatalogFilter, GuestRange};
use crate::storage::events::Segment;
use crate::storage::requests::{DateRequest, EntryRequest, RequestKind};

type Rows = Vec<Vec<InlineKeyboardButton>>;

pub fn btn(text: impl Into<String>, data: impl Into<String>) -> InlineKeyboardButton {
    InlineKeyboardButton::callback(text, data)
}

/// URL button; `None` when the link does not parse.
pub fn url_btn(text: impl Into<String>, url: &str) -> Option<InlineKeyboardButton> {
    match Url::parse(url.trim()) {
        Ok(parsed) => Some(InlineKeyboardButton::url(text, parsed)),
        Err(e) => {
            log::warn!("Dropping button with invalid URL {:?}: {}", url, e);
            None
        }
    }
}

/// `⬅️ Назад` + `🏠 Главная`
pub fn nav(back_cb: &str) -> Rows {
    vec![vec![btn("⬅️ Назад", back_cb), btn("🏠 Главная", "home")]]
}

pub fn nav_kb(back_cb: &str) -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(nav(back_cb))
}

fn with_nav(mut rows: Rows, back_cb: &str) -> InlineKeyboardMarkup {
    rows.extend(nav(back_cb));
    InlineKeyboardMarkup::new(rows)
}

fn push_row(rows: &mut Rows, row: Vec<Option<InlineKeyboardButton>>) {
    let row: Vec<_> = row.into_iter().flatten().collect();
    if !row.is_empty() {
        rows.push(row);
    }
}

// ==================== User screens ====================

pub fn main_menu_kb(is_admin: bool) -> InlineKeyboardMarkup {
    let mut rows = vec![
        vec![btn("🏠 Квартиры", "catalog:1"), btn("📅 Бронирование", "booking:main")],
        vec![btn("👤 Кабинет", "cabinet"), btn("❓ Правила", "rules")],
        vec![btn("🎁 Промокоды", "promo:menu"), btn("🎲 Розыгрыш", "giveaway:menu")],
    ];
    if is_admin {
        rows.push(vec![btn("🛠 Админ-панель", "admin:menu")]);
    }
    InlineKeyboardMarkup::new(rows)
}

/// Кнопки под приветственным (якорным) сообщением
pub fn start_entry_kb() -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![
        vec![btn("👋 Перейти в главное меню", "start:menu")],
        vec![btn("🗓 Написать желаемую дату заезда", "start:date")],
    ])
}

pub fn catalog_kb(apartments: &[Apartment], page: usize, total: usize, page_size: usize) -> InlineKeyboardMarkup {
    let pages = page_count(total, page_size);
    let mut rows: Rows = apartments
        .iter()
        .map(|apt| vec![btn(format!("🏙 {}", apt.title), format!("apt:{}:card:{}", apt.id, page))])
        .collect();

    let mut pager = Vec::with_capacity(3);
    if page > 1 {
        pager.push(btn("◀️", format!("catalog:{}", page - 1)));
    }
    pager.push(btn(format!("Стр. {}/{}", page, pages), "noop"));
    if page < pages {
        pager.push(btn("▶️", format!("catalog:{}", page + 1)));
    }
    rows.push(pager);
    rows.push(vec![btn("⚙️ Фильтры", "flt:open"), btn("📅 Забронировать", "booking:catalog")]);
    with_nav(rows, "home")
}

fn checked(selected: bool, label: &str) -> String {
    if selected {
        format!("✅ {label}")
    } else {
        label.to_string()
    }
}

pub fn filter_menu_kb(filter: &CatalogFilter) -> InlineKeyboardMarkup {
    let guests = |range: GuestRange, label: &str| {
        btn(
            checked(filter.guests == Some(range), label),
            format!("flt:g:{}", range),
        )
    };
    let tag = |name: &str| {
        let icon = if filter.tags.contains(name) { "✅" } else { "🏷" };
        btn(format!("{icon} {name}"), format!("flt:t:{name}"))
    };

    let mut rows = vec![
        vec![
            guests(GuestRange::UpToTwo, "👤 До 2 гостей"),
            guests(GuestRange::UpToFour, "👨‍👩‍👧 До 4 гостей"),
        ],
        vec![guests(GuestRange::FiveAndMore, "👥 5+ гостей")],
    ];

    let budgets: Vec<_> = BUDGET_THRESHOLDS
        .iter()
        .map(|&limit| {
            btn(
                checked(filter.budget == Some(limit), &format!("💰 до {limit}")),
                format!("flt:b:{limit}"),
            )
        })
        .collect();
    rows.extend(budgets.chunks(3).map(<[_]>::to_vec));

    rows.extend(FILTER_TAGS.chunks(2).map(|pair| pair.iter().map(|t| tag(t)).collect()));
    rows.push(vec![btn("✅ Применить", "flt:apply"), btn("♻️ Сбросить", "flt:reset")]);
    with_nav(rows, "catalog:1")
}

pub fn apartment_card_kb(apt: &Apartment, page: usize, has_media: bool) -> InlineKeyboardMarkup {
    let mut rows = Vec::new();
    if has_media {
        rows.push(vec![btn("🖼 Посмотреть фотографии", format!("aptmedia:{}:0:{}", apt.id, page))]);
    }
    push_row(
        &mut rows,
        vec![
            Some(apt.map_url.as_str())
                .filter(|u| !u.is_empty())
                .and_then(|u| url_btn("🗺 Карта", u)),
            Some(btn("📅 Забронировать", format!("book:apt:{}", apt.id))),
        ],
    );
    if !apt.channel_post_url.is_empty() {
        push_row(&mut rows, vec![url_btn("📣 Пост в канале", &apt.channel_post_url)]);
    }
    rows.push(vec![btn("🤔 Не определился", format!("dates:{}", apt.id))]);
    with_nav(rows, &format!("catalog:{page}"))
}

/// Карусель медиа: `index` уже приведён к диапазону
pub fn media_carousel_kb(apartment_id: i64, index: usize, count: usize, page: usize) -> InlineKeyboardMarkup {
    let mut rows = vec![vec![btn("⬅️ К карточке", format!("aptmedia:back:{apartment_id}:{page}"))]];
    if count > 1 {
        let prev = (index + count - 1) % count;
        let next = (index + 1) % count;
        rows.push(vec![
            btn("◀️", format!("aptmedia:{apartment_id}:{prev}:{page}")),
            btn(format!("{}/{}", index + 1, count), "noop"),
            btn("▶️", format!("aptmedia:{apartment_id}:{next}:{page}")),
        ]);
    }
    with_nav(rows, "home")
}

/// Fallback when Telegram refuses to render the link as media
pub fn media_link_kb(url: &str, carousel: &InlineKeyboardMarkup) -> InlineKeyboardMarkup {
    let mut rows = Vec::new();
    push_row(&mut rows, vec![url_btn("🔗 Открыть текущее медиа", url)]);
    rows.extend(carousel.inline_keyboard.iter().cloned());
    InlineKeyboardMarkup::new(rows)
}

pub fn booking_kb(booking_url: &str, back_cb: &str) -> InlineKeyboardMarkup {
    let mut rows = Vec::new();
    push_row(&mut rows, vec![url_btn("📅 Открыть бронирование", booking_url)]);
    with_nav(rows, back_cb)
}

pub fn promo_menu_kb() -> InlineKeyboardMarkup {
    with_nav(
        vec![
            vec![btn("🎁 Получить welcome", "promo:welcome"), btn("🔗 Реферальная ссылка", "promo:ref")],
            vec![btn("📦 Мои промокоды", "promo:mine")],
        ],
        "home",
    )
}

pub fn giveaway_kb(joined: bool) -> InlineKeyboardMarkup {
    let button = if joined {
        btn("✅ Вы участвуете", "giveaway:joined")
    } else {
        btn("✅ Участвовать", "giveaway:join")
    };
    with_nav(vec![vec![button]], "home")
}

pub fn rules_kb() -> InlineKeyboardMarkup {
    with_nav(vec![vec![btn("📅 Перейти к бронированию", "booking:rules")]], "home")
}

pub fn cabinet_kb() -> InlineKeyboardMarkup {
    with_nav(
        vec![vec![btn("🔗 Моя реф-ссылка", "promo:ref"), btn("🎁 Мои промокоды", "promo:mine")]],
        "home",
    )
}

pub fn reminder_kb() -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![
        vec![btn("🔥 Открыть каталог", "catalog:1"), btn("❌ Не получать", "rem:off")],
        vec![btn("🏠 Главная", "home")],
    ])
}

/// Под ответом администратора: пользователь может ответить тому же админу
pub fn user_reply_kb(kind: RequestKind, request_id: i64, admin_id: i64) -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![
        vec![btn(
            "💬 Ответить администратору",
            format!("user:reply_admin:{kind}:{request_id}:{admin_id}"),
        )],
        vec![btn("🏠 Главная", "home")],
    ])
}

// ==================== Admin screens ====================

pub fn admin_menu_kb() -> InlineKeyboardMarkup {
    with_nav(
        vec![
            vec![btn("🏠 Квартиры", "admin:apartments"), btn("📥 Заявки", "admin:requests")],
            vec![btn("🗓 Даты на старте", "admin:entry_dates"), btn("📣 Пост в канал", "admin:channel_post")],
            vec![btn("🟢 Закреп: Бронь", "admin:catalog_button"), btn("📚 Кнопка Каталог", "admin:catalog_only")],
            vec![btn("🎟 Промокоды", "admin:codes"), btn("🎲 Розыгрыш", "admin:giveaway")],
            vec![btn("📊 Статистика", "admin:stats"), btn("✉️ Рассылка", "admin:broadcast")],
        ],
        "home",
    )
}

pub fn admin_apartments_menu_kb() -> InlineKeyboardMarkup {
    with_nav(
        vec![vec![btn("➕ Добавить квартиру", "admin:apt:add"), btn("📋 Список", "admin:apt:list")]],
        "admin:menu",
    )
}

pub fn admin_apartment_list_kb(apartments: &[Apartment]) -> InlineKeyboardMarkup {
    let rows = apartments
        .iter()
        .map(|apt| {
            let status = if apt.is_active { "🟢" } else { "⚫️" };
            vec![btn(format!("{status} {}", apt.title), format!("admin:apt:open:{}", apt.id))]
        })
        .collect();
    with_nav(rows, "admin:apartments")
}

pub fn admin_apartment_kb(apartment_id: i64) -> InlineKeyboardMarkup {
    let edit = |label: &str, field: ApartmentField| btn(label, format!("admin:apt:edit:{apartment_id}:{field}"));
    with_nav(
        vec![
            vec![btn("🧩 Мастер редактирования", format!("admin:apt:wizard:{apartment_id}"))],
            vec![
                btn("📣 Предпросмотр поста", format!("admin:apt:postpreview:{apartment_id}")),
                btn("📤 В канал", format!("admin:apt:publish:{apartment_id}")),
            ],
            vec![btn("🔁 Вкл/выкл", format!("admin:apt:toggle:{apartment_id}"))],
            vec![
                edit("🔗 Пост URL", ApartmentField::ChannelPostUrl),
                edit("🗺 Карта URL", ApartmentField::MapUrl),
            ],
            vec![edit("🏷 Теги", ApartmentField::Tags), edit("↕️ Порядок", ApartmentField::SortOrder)],
        ],
        "admin:apt:list",
    )
}

pub fn wizard_text_kb() -> InlineKeyboardMarkup {
    with_nav(vec![vec![btn("❌ Отменить мастер", "aptw:cancel")]], "admin:apartments")
}

pub fn wizard_media_kb() -> InlineKeyboardMarkup {
    with_nav(
        vec![vec![btn("✅ Завершить медиа", "aptw:media:done"), btn("❌ Отменить мастер", "aptw:cancel")]],
        "admin:apartments",
    )
}

pub fn wizard_preview_kb() -> InlineKeyboardMarkup {
    with_nav(
        vec![
            vec![btn("✅ Сохранить", "aptw:preview:save"), btn("🔁 Заполнить заново", "aptw:preview:restart")],
            vec![btn("❌ Отменить", "aptw:preview:cancel")],
        ],
        "admin:apartments",
    )
}

/// Кнопки под постом квартиры в канале
pub fn apartment_post_kb(booking_url: &str, map_url: &str, contacts: &ManagerContacts) -> InlineKeyboardMarkup {
    let mut rows = Vec::new();
    push_row(&mut rows, vec![url_btn("📅 Забронировать", booking_url)]);
    push_row(
        &mut rows,
        vec![
            contacts.phone.as_deref().and_then(|u| url_btn("📞 Позвонить", u)),
            contacts.telegram.as_deref().and_then(|u| url_btn("✔️ Написать в ТГ", u)),
        ],
    );
    push_row(
        &mut rows,
        vec![contacts.whatsapp.as_deref().and_then(|u| url_btn("🟢 Написать в WhatsApp", u))],
    );
    if !map_url.is_empty() {
        push_row(&mut rows, vec![url_btn("🗺 Карта", map_url)]);
    }
    InlineKeyboardMarkup::new(rows)
}

pub fn admin_codes_kb() -> InlineKeyboardMarkup {
    with_nav(
        vec![
            vec![btn("➕ Добавить код", "admin:code:add"), btn("📥 Bulk загрузка", "admin:code:bulk")],
            vec![btn("🧾 Список по типу", "admin:code:list")],
        ],
        "admin:menu",
    )
}

pub fn admin_giveaway_kb() -> InlineKeyboardMarkup {
    with_nav(vec![vec![btn("🎲 Разыграть", "admin:giveaway:draw")]], "admin:menu")
}

pub fn broadcast_segments_kb() -> InlineKeyboardMarkup {
    let segment = |label: &str, segment: Segment| btn(label, format!("admin:bc:{segment}"));
    with_nav(
        vec![
            vec![segment("👥 Всем", Segment::All), segment("🕒 Неактивные 7+", Segment::Inactive)],
            vec![segment("👀 Смотрели, но не бронировали", Segment::ViewNoBook)],
        ],
        "admin:menu",
    )
}

pub fn broadcast_confirm_kb() -> InlineKeyboardMarkup {
    with_nav(vec![vec![btn("✅ Подтвердить", "admin:bc:confirm")]], "admin:broadcast")
}

/// Уведомление о новой заявке с датами и карточка заявки в админке
pub fn date_request_kb(request_id: i64, back_cb: Option<&str>) -> InlineKeyboardMarkup {
    let rows = vec![
        vec![btn("✅ Ответить", format!("req:reply:{request_id}"))],
        vec![btn("🎁 Выдать промокод", format!("req:promo:{request_id}"))],
        vec![btn("🟡 Пометить обработано", format!("req:done:{request_id}"))],
    ];
    match back_cb {
        Some(back) => with_nav(rows, back),
        None => InlineKeyboardMarkup::new(rows),
    }
}

pub fn entry_request_kb(request_id: i64, back_cb: Option<&str>) -> InlineKeyboardMarkup {
    let rows = vec![
        vec![btn("✅ Ответить", format!("entry:req:reply:{request_id}"))],
        vec![btn("🟡 Пометить обработано", format!("entry:req:done:{request_id}"))],
    ];
    match back_cb {
        Some(back) => with_nav(rows, back),
        None => InlineKeyboardMarkup::new(rows),
    }
}

fn status_icon(is_new: bool) -> &'static str {
    if is_new { "🆕" } else { "✅" }
}

pub fn date_request_list_kb(requests: &[DateRequest]) -> InlineKeyboardMarkup {
    let rows = requests
        .iter()
        .map(|r| {
            vec![btn(
                format!("{} #{} user:{} apt:{}", status_icon(r.is_new()), r.id, r.user_id, r.apartment_id),
                format!("admin:req:open:{}", r.id),
            )]
        })
        .collect();
    with_nav(rows, "admin:menu")
}

pub fn entry_request_list_kb(requests: &[EntryRequest]) -> InlineKeyboardMarkup {
    let rows = requests
        .iter()
        .map(|r| {
            vec![btn(
                format!(
                    "{} #{} user:{}: {}",
                    status_icon(r.is_new()),
                    r.id,
                    r.user_id,
                    crate::core::text::preview_line(&r.raw_text)
                ),
                format!("entry:req:open:{}", r.id),
            )]
        })
        .collect();
    with_nav(rows, "admin:menu")
}

/// Свободные manual-коды для заявки плюс ручной ввод
pub fn request_promo_kb(request_id: i64, free_codes: &[String]) -> InlineKeyboardMarkup {
    let mut rows: Rows = free_codes
        .iter()
        .map(|code| vec![btn(format!("🎁 {code}"), format!("req:promo_pick:{request_id}:{code}"))])
        .collect();
    rows.push(vec![btn("⌨️ Ввести вручную", format!("req:promo_manual:{request_id}"))]);
    with_nav(rows, "admin:requests")
}

pub fn catalog_button_menu_kb() -> InlineKeyboardMarkup {
    with_nav(
        vec![vec![btn("📤 Опубликовать закреп с бронью", "admin:catalog_button:publish")]],
        "admin:menu",
    )
}

pub fn catalog_only_menu_kb() -> InlineKeyboardMarkup {
    with_nav(
        vec![
            vec![btn("📤 Опубликовать кнопку Каталог", "admin:catalog_only:publish")],
            vec![btn("🔗 Обновить ссылку Каталог", "admin:catalog_only:set_link")],
        ],
        "admin:menu",
    )
}

/// Single-button markup published in the channel
pub fn channel_link_kb(label: &str, url: &str) -> InlineKeyboardMarkup {
    let mut rows = Vec::new();
    push_row(&mut rows, vec![url_btn(label, url)]);
    InlineKeyboardMarkup::new(rows)
}

pub fn channel_post_media_kb() -> InlineKeyboardMarkup {
    with_nav(
        vec![
            vec![btn("✅ Готово, к тексту", "admin:channel_post:done")],
            vec![btn("❌ Отменить", "admin:channel_post:cancel")],
        ],
        "admin:menu",
    )
}

pub fn channel_post_text_kb() -> InlineKeyboardMarkup {
    with_nav(vec![vec![btn("❌ Отменить", "admin:channel_post:cancel")]], "admin:menu")
}

pub fn channel_post_preview_kb() -> InlineKeyboardMarkup {
    with_nav(
        vec![
            vec![btn("📤 Опубликовать", "admin:channel_post:publish")],
            vec![btn("❌ Отменить", "admin:channel_post:cancel")],
        ],
        "admin:menu",
    )
}

/// Кнопки под произвольным постом из конструктора
pub fn channel_custom_buttons_kb(
    bot_username: &str,
    booking_url: &str,
    manager_link: &str,
    whatsapp_link: &str,
) -> InlineKeyboardMarkup {
    let mut rows = Vec::new();
    push_row(
        &mut rows,
        vec![
            url_btn("🏠 Квартиры", &format!("https://t.me/{bot_username}")),
            url_btn("📅 Бронь", booking_url),
        ],
    );
    push_row(
        &mut rows,
        vec![url_btn("👤 Менеджер", manager_link), url_btn("🟢 WhatsApp", whatsapp_link)],
    );
    InlineKeyboardMarkup::new(rows)
}
