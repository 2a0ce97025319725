//! Weather condition to Weather Icons mapping.
//!
//! Condition codes follow <https://openweathermap.org/weather-conditions>;
//! CSS class names come from <https://erikflowers.github.io/weather-icons/>.
//! Named conditions follow the Home Assistant weather entity vocabulary.

const THUNDERSTORM: i32 = 200;
const DRIZZLE: i32 = 300;
const RAIN: i32 = 500;
const SNOW: i32 = 600;

/// Icon identifiers the stylesheet ships glyphs for. Fuzzy fallback for
/// unrecognized named conditions picks the nearest entry from this catalog.
const ICON_CATALOG: &[&str] = &[
    "day-sunny",
    "night-clear",
    "cloud",
    "cloudy",
    "day-haze",
    "fog",
    "hail",
    "lightning",
    "thunderstorm",
    "showers",
    "rain",
    "sprinkle",
    "sleet",
    "snow",
    "smoke",
    "dust",
    "sandstorm",
    "volcano",
    "strong-wind",
    "windy",
    "tornado",
    "na",
];

/// Home Assistant condition names with their icon and display label.
const NAMED_CONDITIONS: &[(&str, &str, &str)] = &[
    ("clear-night", "night-clear", "Clear"),
    ("cloudy", "cloudy", "Cloudy"),
    ("exceptional", "na", "Exceptional"),
    ("fog", "fog", "Fog"),
    ("hail", "hail", "Hail"),
    ("lightning-rainy", "thunderstorm", "Thunderstorm"),
    ("lightning", "lightning", "Lightning"),
    ("partlycloudy", "cloud", "Partly Cloudy"),
    ("pouring", "rain", "Pouring"),
    ("rainy", "showers", "Rain"),
    ("snowy-rainy", "sleet", "Snow and Rain"),
    ("snowy", "snow", "Snow"),
    ("sunny", "day-sunny", "Sunny"),
    ("windy-variant", "strong-wind", "Windy"),
    ("windy", "windy", "Windy"),
];

fn css_class(icon: &str) -> String {
    format!("wi wi-{icon}")
}

/// Map an OpenWeatherMap condition code to `(css_class, label)`.
///
/// Total over all of `i32`; unrecognized codes map to the `na` sentinel.
pub fn map_condition_code(code: i32) -> (String, String) {
    let (icon, label) = match code {
        _ if (THUNDERSTORM..THUNDERSTORM + 100).contains(&code) => {
            ("thunderstorm", "Thunderstorm")
        }
        _ if (DRIZZLE..DRIZZLE + 100).contains(&code) => ("sprinkle", "Drizzle"),
        _ if (RAIN..RAIN + 100).contains(&code) => ("rain", "Rain"),
        _ if (SNOW..SNOW + 100).contains(&code) => ("snow", "Snow"),
        701 => ("fog", "Mist"),
        711 => ("smoke", "Smoke"),
        721 => ("day-haze", "Haze"),
        731 | 761 => ("dust", "Dust"),
        741 => ("fog", "Fog"),
        751 => ("sandstorm", "Sand"),
        762 => ("volcano", "Ash"),
        771 => ("strong-wind", "Squall"),
        781 => ("tornado", "Tornado"),
        800 => ("day-sunny", "Clear"),
        801 => ("cloud", "Few Clouds"),
        802 | 803 => ("cloudy", "Partly Cloudy"),
        804 => ("cloudy", "Overcast"),
        _ => ("na", "Unknown"),
    };
    (css_class(icon), label.to_string())
}

/// Map a named condition to `(css_class, label)`.
///
/// Known Home Assistant vocabulary hits the fixed table. A raw string that
/// is itself a catalog icon name is used verbatim. Anything else falls back
/// to the catalog entry with the smallest edit distance, ties broken by
/// catalog order.
pub fn map_condition_name(raw: &str) -> (String, String) {
    for (name, icon, label) in NAMED_CONDITIONS {
        if raw == *name {
            return (css_class(icon), (*label).to_string());
        }
    }

    if ICON_CATALOG.contains(&raw) {
        return (css_class(raw), humanize(raw));
    }

    let mut best = ICON_CATALOG[0];
    let mut best_distance = edit_distance(raw, best);
    for candidate in &ICON_CATALOG[1..] {
        let distance = edit_distance(raw, candidate);
        if distance < best_distance {
            best = candidate;
            best_distance = distance;
        }
    }
    (css_class(best), humanize(raw))
}

/// Levenshtein distance between two strings, by character.
fn edit_distance(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();

    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut curr = vec![0; b.len() + 1];

    for (i, ca) in a.iter().enumerate() {
        curr[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let substitute = prev[j] + usize::from(ca != cb);
            curr[j + 1] = substitute.min(prev[j + 1] + 1).min(curr[j] + 1);
        }
        std::mem::swap(&mut prev, &mut curr);
    }
    prev[b.len()]
}

/// "partly-cloudy" -> "Partly Cloudy"
fn humanize(raw: &str) -> String {
    raw.split(['-', '_'])
        .filter(|w| !w.is_empty())
        .map(|w| {
            let mut chars = w.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}
