//! Localized display strings for briefing labels and units
//!
//! Lookups fall back from the requested language to English and finally to
//! the key itself, so an unknown key or language never fails.

/// Language every key is expected to carry.
pub const FALLBACK_LANG: &str = "en";

/// Symbolic keys of the built-in table.
pub mod keys {
    pub const BIRTHDAYS: &str = "birthdays";
    pub const CURRENCY_BASKET: &str = "currency_basket";
    pub const DAY_LENGTH: &str = "day_length";
    pub const FIRST_MEETING: &str = "first_meeting";
    pub const HPA: &str = "hpa";
    pub const HUMIDITY: &str = "humidity";
    pub const METERS_PER_SECOND: &str = "m*s**-1";
    pub const NO_BIRTHDAYS: &str = "no_birthdays";
    pub const NO_EVENTS: &str = "no_events";
    pub const PRESSURE: &str = "pressure";
    pub const TEMPERATURE: &str = "temperature";
    pub const WEATHER: &str = "weather";
    pub const WIND: &str = "wind";
}

type Entry = (&'static str, &'static [(&'static str, &'static str)]);

static TRANSLATIONS: &[Entry] = &[
    (
        keys::BIRTHDAYS,
        &[("en", "Birthdays"), ("ru", "Дни рождения")],
    ),
    (
        keys::CURRENCY_BASKET,
        &[("en", "Currency basket"), ("ru", "Валютная корзина")],
    ),
    (
        keys::DAY_LENGTH,
        &[("en", "Length of day"), ("ru", "Световой день")],
    ),
    (
        keys::FIRST_MEETING,
        &[("en", "First meeting"), ("ru", "Первое совещание")],
    ),
    (keys::HPA, &[("en", "hPa"), ("ru", "гПа")]),
    (keys::HUMIDITY, &[("en", "hum"), ("ru", "влаж.")]),
    (keys::METERS_PER_SECOND, &[("en", "m/s"), ("ru", "м/с")]),
    (
        keys::NO_BIRTHDAYS,
        &[
            ("en", "There are no birthdays today."),
            ("ru", "Сегодня нет дней рождения."),
        ],
    ),
    (
        keys::NO_EVENTS,
        &[
            ("en", "There are no events today."),
            ("ru", "Календарь на сегодня пуст."),
        ],
    ),
    (keys::PRESSURE, &[("en", "press"), ("ru", "давл.")]),
    (keys::TEMPERATURE, &[("en", "temp"), ("ru", "темп.")]),
    (
        keys::WEATHER,
        &[
            ("en", "Weather (temp/feeling, cloud, wind, press, hum)"),
            ("ru", "Погода (темп./ощущение, обл, вет, давл, влаж)"),
        ],
    ),
    (keys::WIND, &[("en", "wind"), ("ru", "ветр.")]),
];

/// Return the display string for `key` in `lang`.
///
/// Falls back to English when `lang` has no entry, and to `key` itself when
/// the key is unknown or has no English entry either.
#[must_use]
pub fn get<'a>(key: &'a str, lang: &str) -> &'a str {
    let Some((_, values)) = TRANSLATIONS.iter().find(|(k, _)| *k == key) else {
        return key;
    };
    let found: Option<&'a str> = lookup(values, lang).or_else(|| lookup(values, FALLBACK_LANG));
    found.unwrap_or(key)
}

fn lookup(values: &[(&'static str, &'static str)], lang: &str) -> Option<&'static str> {
    values.iter().find(|(l, _)| *l == lang).map(|(_, v)| *v)
}

/// Every key of the built-in table.
pub fn known_keys() -> impl Iterator<Item = &'static str> {
    TRANSLATIONS.iter().map(|(key, _)| *key)
}
