/// Linux keycode of the Enter key, which the badge reader sends after each badge
pub const KEY_ENTER: u16 = 28;

/// Decoded meaning of a keyboard scancode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Digit(u8),
    /// End of a badge read
    Terminator,
    /// Any other recognised key; ignored by the scan decoder
    Other(&'static str),
}

/// Map a US-layout keyboard scancode to a key.
///
/// Returns `None` for codes outside the table.
pub fn lookup_key(code: u16) -> Option<Key> {
    let key = match code {
        2..=10 => Key::Digit((code - 1) as u8),
        11 => Key::Digit(0),
        KEY_ENTER => Key::Terminator,
        1 => Key::Other("ESC"),
        12 => Key::Other("-"),
        13 => Key::Other("="),
        14 => Key::Other("BKSP"),
        15 => Key::Other("TAB"),
        16 => Key::Other("q"),
        17 => Key::Other("w"),
        18 => Key::Other("e"),
        19 => Key::Other("r"),
        20 => Key::Other("t"),
        21 => Key::Other("y"),
        22 => Key::Other("u"),
        23 => Key::Other("i"),
        24 => Key::Other("o"),
        25 => Key::Other("p"),
        26 => Key::Other("["),
        27 => Key::Other("]"),
        29 => Key::Other("LCTRL"),
        30 => Key::Other("a"),
        31 => Key::Other("s"),
        32 => Key::Other("d"),
        33 => Key::Other("f"),
        34 => Key::Other("g"),
        35 => Key::Other("h"),
        36 => Key::Other("j"),
        37 => Key::Other("k"),
        38 => Key::Other("l"),
        39 => Key::Other(";"),
        40 => Key::Other("\""),
        41 => Key::Other("`"),
        42 => Key::Other("LSHFT"),
        43 => Key::Other("\\"),
        44 => Key::Other("z"),
        45 => Key::Other("x"),
        46 => Key::Other("c"),
        47 => Key::Other("v"),
        48 => Key::Other("b"),
        49 => Key::Other("n"),
        50 => Key::Other("m"),
        51 => Key::Other(","),
        52 => Key::Other("."),
        53 => Key::Other("/"),
        54 => Key::Other("RSHFT"),
        56 => Key::Other("LALT"),
        57 => Key::Other(" "),
        100 => Key::Other("RALT"),
        _ => return None,
    };
    Some(key)
}
