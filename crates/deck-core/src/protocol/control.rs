//! Inbound control-message routing.
//!
//! A control peer addresses a button by path, for example
//! `/press/bank/3/7` or `/style/bgcolor/2/1`.  The routes are tried in a fixed
//! order; the first matching pattern decides which argument shape is valid.
//! A message whose address matches nothing, or whose arguments do not fit the
//! matched route, produces no action at all.
//!
//! | Route                       | Arguments            | Action              |
//! |-----------------------------|----------------------|---------------------|
//! | `/press/bank/B/K`           | none                 | `Trigger`           |
//! | `/press/bank/B/K`           | int `1` / int `0`    | `Press` down / up   |
//! | `/style/bgcolor/B/K`        | three numbers r,g,b  | `SetStyle(BgColor)` |
//! | `/style/color/B/K`          | three numbers r,g,b  | `SetStyle(Color)`   |
//! | `/style/text/B/K`           | one string           | `SetStyle(Text)`    |
//!
//! Only the leading arguments a route needs are inspected; trailing extras are
//! ignored.

use std::sync::OnceLock;

use regex::Regex;
use rosc::{OscMessage, OscType};

use crate::domain::command::StyleChange;

/// What a recognised control message asks for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControlAction {
    /// Press now, release after the auto-release delay.
    Trigger { bank: u32, button: u32 },
    Press {
        bank: u32,
        button: u32,
        pressed: bool,
    },
    SetStyle {
        bank: u32,
        button: u32,
        style: StyleChange,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Route {
    Press,
    BgColor,
    Color,
    Text,
}

// Priority order matters: the first match wins.
const ROUTES: [(Route, &str); 4] = [
    (Route::Press, r"^/press/bank/([0-9]+)/([0-9]+)$"),
    (Route::BgColor, r"^/style/bgcolor/([0-9]+)/([0-9]+)$"),
    (Route::Color, r"^/style/color/([0-9]+)/([0-9]+)$"),
    (Route::Text, r"^/style/text/([0-9]+)/([0-9]+)$"),
];

fn patterns() -> &'static [(Route, Regex)] {
    static PATTERNS: OnceLock<Vec<(Route, Regex)>> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        ROUTES
            .iter()
            .map(|(route, pattern)| {
                (
                    *route,
                    Regex::new(pattern).expect("built-in route pattern must compile"),
                )
            })
            .collect()
    })
}

/// Matches `address` against the routes, returning the route and the bank and
/// button identifiers from the path.
///
/// An identifier too large for `u32` makes the whole address unmatched.
fn match_address(address: &str) -> Option<(Route, u32, u32)> {
    let (route, caps) = patterns()
        .iter()
        .find_map(|(route, re)| re.captures(address).map(|caps| (*route, caps)))?;
    let bank = caps[1].parse().ok()?;
    let button = caps[2].parse().ok()?;
    Some((route, bank, button))
}

/// Translates one control message into an action, or `None` to drop it.
///
/// # Examples
///
/// ```rust
/// use deck_core::protocol::control::{route_message, ControlAction};
/// use rosc::OscMessage;
///
/// let msg = OscMessage { addr: "/press/bank/3/7".to_string(), args: vec![] };
/// assert_eq!(
///     route_message(&msg),
///     Some(ControlAction::Trigger { bank: 3, button: 7 })
/// );
/// ```
pub fn route_message(msg: &OscMessage) -> Option<ControlAction> {
    let (route, bank, button) = match_address(&msg.addr)?;

    match route {
        Route::Press => match msg.args.first() {
            None => Some(ControlAction::Trigger { bank, button }),
            Some(OscType::Int(1)) => Some(ControlAction::Press {
                bank,
                button,
                pressed: true,
            }),
            Some(OscType::Int(0)) => Some(ControlAction::Press {
                bank,
                button,
                pressed: false,
            }),
            Some(_) => None,
        },
        Route::BgColor => rgb_from_args(&msg.args).map(|rgb| ControlAction::SetStyle {
            bank,
            button,
            style: StyleChange::BgColor(rgb),
        }),
        Route::Color => rgb_from_args(&msg.args).map(|rgb| ControlAction::SetStyle {
            bank,
            button,
            style: StyleChange::Color(rgb),
        }),
        Route::Text => match msg.args.first() {
            Some(OscType::String(text)) => Some(ControlAction::SetStyle {
                bank,
                button,
                style: StyleChange::Text(text.clone()),
            }),
            _ => None,
        },
    }
}

/// Packs three channels into `0xRRGGBB`, masking each to its low 8 bits.
///
/// Out-of-range values wrap rather than fail: `256` becomes `0`, `-1`
/// becomes `255`.
pub fn pack_rgb(r: i64, g: i64, b: i64) -> u32 {
    (((r & 0xff) << 16) | ((g & 0xff) << 8) | (b & 0xff)) as u32
}

fn rgb_from_args(args: &[OscType]) -> Option<u32> {
    match args {
        [r, g, b, ..] => Some(pack_rgb(numeric(r)?, numeric(g)?, numeric(b)?)),
        _ => None,
    }
}

/// Integer value of a numeric argument; floats truncate toward zero and
/// non-finite floats count as zero.
fn numeric(arg: &OscType) -> Option<i64> {
    match arg {
        OscType::Int(v) => Some(i64::from(*v)),
        OscType::Long(v) => Some(*v),
        OscType::Float(v) if v.is_finite() => Some(*v as i64),
        OscType::Double(v) if v.is_finite() => Some(*v as i64),
        OscType::Float(_) | OscType::Double(_) => Some(0),
        _ => None,
    }
}
