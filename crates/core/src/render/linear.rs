//! Module patterns for the linear symbologies.
//!
//! Each encoder returns one `bool` per module (`true` = bar), including the
//! quiet zones on both sides.

use super::RenderFailure;

/// Quiet zone added on each side of a linear symbol, in modules.
pub const QUIET_ZONE: usize = 10;

fn with_quiet_zone(body: Vec<bool>) -> Vec<bool> {
    let mut modules = vec![false; QUIET_ZONE];
    modules.extend(body);
    modules.extend(std::iter::repeat_n(false, QUIET_ZONE));
    modules
}

/// Append alternating bar/space runs described by digit widths, starting
/// with a bar.
fn push_widths(out: &mut Vec<bool>, widths: &[u8]) {
    for (i, &w) in widths.iter().enumerate() {
        out.extend(std::iter::repeat_n(i % 2 == 0, usize::from(w)));
    }
}

// ── Code 128 ────────────────────────────────────────────────────────────

/// Element widths for symbol values 0..=105 (bar, space, bar, ...).
/// The stop pattern is separate.
const CODE128_PATTERNS: [&[u8]; 106] = [
    &[2, 1, 2, 2, 2, 2], &[2, 2, 2, 1, 2, 2], &[2, 2, 2, 2, 2, 1], &[1, 2, 1, 2, 2, 3],
    &[1, 2, 1, 3, 2, 2], &[1, 3, 1, 2, 2, 2], &[1, 2, 2, 2, 1, 3], &[1, 2, 2, 3, 1, 2],
    &[1, 3, 2, 2, 1, 2], &[2, 2, 1, 2, 1, 3], &[2, 2, 1, 3, 1, 2], &[2, 3, 1, 2, 1, 2],
    &[1, 1, 2, 2, 3, 2], &[1, 2, 2, 1, 3, 2], &[1, 2, 2, 2, 3, 1], &[1, 1, 3, 2, 2, 2],
    &[1, 2, 3, 1, 2, 2], &[1, 2, 3, 2, 2, 1], &[2, 2, 3, 2, 1, 1], &[2, 2, 1, 1, 3, 2],
    &[2, 2, 1, 2, 3, 1], &[2, 1, 3, 2, 1, 2], &[2, 2, 3, 1, 1, 2], &[3, 1, 2, 1, 3, 1],
    &[3, 1, 1, 2, 2, 2], &[3, 2, 1, 1, 2, 2], &[3, 2, 1, 2, 2, 1], &[3, 1, 2, 2, 1, 2],
    &[3, 2, 2, 1, 1, 2], &[3, 2, 2, 2, 1, 1], &[2, 1, 2, 1, 2, 3], &[2, 1, 2, 3, 2, 1],
    &[2, 3, 2, 1, 2, 1], &[1, 1, 1, 3, 2, 3], &[1, 3, 1, 1, 2, 3], &[1, 3, 1, 3, 2, 1],
    &[1, 1, 2, 3, 1, 3], &[1, 3, 2, 1, 1, 3], &[1, 3, 2, 3, 1, 1], &[2, 1, 1, 3, 1, 3],
    &[2, 3, 1, 1, 1, 3], &[2, 3, 1, 3, 1, 1], &[1, 1, 2, 1, 3, 3], &[1, 1, 2, 3, 3, 1],
    &[1, 3, 2, 1, 3, 1], &[1, 1, 3, 1, 2, 3], &[1, 1, 3, 3, 2, 1], &[1, 3, 3, 1, 2, 1],
    &[3, 1, 3, 1, 2, 1], &[2, 1, 1, 3, 3, 1], &[2, 3, 1, 1, 3, 1], &[2, 1, 3, 1, 1, 3],
    &[2, 1, 3, 3, 1, 1], &[2, 1, 3, 1, 3, 1], &[3, 1, 1, 1, 2, 3], &[3, 1, 1, 3, 2, 1],
    &[3, 3, 1, 1, 2, 1], &[3, 1, 2, 1, 1, 3], &[3, 1, 2, 3, 1, 1], &[3, 3, 2, 1, 1, 1],
    &[3, 1, 4, 1, 1, 1], &[2, 2, 1, 4, 1, 1], &[4, 3, 1, 1, 1, 1], &[1, 1, 1, 2, 2, 4],
    &[1, 1, 1, 4, 2, 2], &[1, 2, 1, 1, 2, 4], &[1, 2, 1, 4, 2, 1], &[1, 4, 1, 1, 2, 2],
    &[1, 4, 1, 2, 2, 1], &[1, 1, 2, 2, 1, 4], &[1, 1, 2, 4, 1, 2], &[1, 2, 2, 1, 1, 4],
    &[1, 2, 2, 4, 1, 1], &[1, 4, 2, 1, 1, 2], &[1, 4, 2, 2, 1, 1], &[2, 4, 1, 2, 1, 1],
    &[2, 2, 1, 1, 1, 4], &[4, 1, 3, 1, 1, 1], &[2, 4, 1, 1, 1, 2], &[1, 3, 4, 1, 1, 1],
    &[1, 1, 1, 2, 4, 2], &[1, 2, 1, 1, 4, 2], &[1, 2, 1, 2, 4, 1], &[1, 1, 4, 2, 1, 2],
    &[1, 2, 4, 1, 1, 2], &[1, 2, 4, 2, 1, 1], &[4, 1, 1, 2, 1, 2], &[4, 2, 1, 1, 1, 2],
    &[4, 2, 1, 2, 1, 1], &[2, 1, 2, 1, 4, 1], &[2, 1, 4, 1, 2, 1], &[4, 1, 2, 1, 2, 1],
    &[1, 1, 1, 1, 4, 3], &[1, 1, 1, 3, 4, 1], &[1, 3, 1, 1, 4, 1], &[1, 1, 4, 1, 1, 3],
    &[1, 1, 4, 3, 1, 1], &[4, 1, 1, 1, 1, 3], &[4, 1, 1, 3, 1, 1], &[1, 1, 3, 1, 4, 1],
    &[1, 1, 4, 1, 3, 1], &[3, 1, 1, 1, 4, 1], &[4, 1, 1, 1, 3, 1], &[2, 1, 1, 4, 1, 2],
    &[2, 1, 1, 2, 1, 4], &[2, 1, 1, 2, 3, 2],
];

const CODE128_START_B: u8 = 104;
const CODE128_START_C: u8 = 105;
const CODE128_STOP: &[u8] = &[2, 3, 3, 1, 1, 1, 2];

/// Code set C packs digit pairs; used for all-digit data of even length.
fn code128_values(data: &str) -> Result<Vec<u8>, RenderFailure> {
    let bytes = data.as_bytes();
    if bytes.len() >= 2 && bytes.len() % 2 == 0 && bytes.iter().all(u8::is_ascii_digit) {
        let mut values = vec![CODE128_START_C];
        values.extend(bytes.chunks(2).map(|p| (p[0] - b'0') * 10 + (p[1] - b'0')));
        return Ok(values);
    }
    let mut values = vec![CODE128_START_B];
    for c in data.chars() {
        match u8::try_from(c) {
            Ok(b @ 32..=127) => values.push(b - 32),
            _ => {
                return Err(RenderFailure::new(format!(
                    "character {c:?} cannot be encoded in Code 128 set B"
                )));
            }
        }
    }
    Ok(values)
}

/// Code 128 with a mod-103 check symbol.
pub(crate) fn code128(data: &str) -> Result<Vec<bool>, RenderFailure> {
    let mut values = code128_values(data)?;
    let checksum = values
        .iter()
        .enumerate()
        .map(|(i, &v)| usize::from(v) * i.max(1))
        .sum::<usize>()
        % 103;
    values.push(checksum as u8);

    let mut body = Vec::with_capacity(values.len() * 11 + 13);
    for v in values {
        push_widths(&mut body, CODE128_PATTERNS[usize::from(v)]);
    }
    push_widths(&mut body, CODE128_STOP);
    Ok(with_quiet_zone(body))
}

// ── EAN-13 ──────────────────────────────────────────────────────────────

/// Left-hand odd-parity (L) codes; bit 6 is the leftmost module.
const EAN_L: [u8; 10] = [
    0b000_1101, 0b001_1001, 0b001_0011, 0b011_1101, 0b010_0011,
    0b011_0001, 0b010_1111, 0b011_1011, 0b011_0111, 0b000_1011,
];

/// Parity of the six left-hand digits, selected by the leading digit
/// (`true` = even parity / G code).
const EAN_FIRST_DIGIT_PARITY: [[bool; 6]; 10] = {
    const L: bool = false;
    const G: bool = true;
    [
        [L, L, L, L, L, L],
        [L, L, G, L, G, G],
        [L, L, G, G, L, G],
        [L, L, G, G, G, L],
        [L, G, L, L, G, G],
        [L, G, G, L, L, G],
        [L, G, G, G, L, L],
        [L, G, L, G, L, G],
        [L, G, L, G, G, L],
        [L, G, G, L, G, L],
    ]
};

/// Check digit for the first 12 digits of an EAN-13.
pub fn ean13_check_digit(digits: &[u8; 12]) -> u8 {
    let sum: u32 = digits
        .iter()
        .enumerate()
        .map(|(i, &d)| u32::from(d) * if i % 2 == 0 { 1 } else { 3 })
        .sum();
    ((10 - sum % 10) % 10) as u8
}

fn push_bits(out: &mut Vec<bool>, bits: u8) {
    out.extend((0..7).rev().map(|i| (bits >> i) & 1 == 1));
}

/// EAN-13. Twelve digits get a computed check digit; a thirteenth digit
/// must match it.
pub(crate) fn ean13(data: &str) -> Result<Vec<bool>, RenderFailure> {
    if !data.bytes().all(|b| b.is_ascii_digit()) || !matches!(data.len(), 12 | 13) {
        return Err(RenderFailure::new("EAN-13 requires 12 or 13 digits"));
    }
    let digits: Vec<u8> = data.bytes().map(|b| b - b'0').collect();
    let mut payload = [0u8; 12];
    payload.copy_from_slice(&digits[..12]);
    let check = ean13_check_digit(&payload);
    if let Some(&given) = digits.get(12) {
        if given != check {
            return Err(RenderFailure::new(format!(
                "EAN-13 check digit mismatch: expected {check}, found {given}"
            )));
        }
    }

    let parity = EAN_FIRST_DIGIT_PARITY[usize::from(payload[0])];
    let mut body = Vec::with_capacity(95);
    body.extend([true, false, true]);
    for (i, &d) in payload[1..7].iter().enumerate() {
        let l = EAN_L[usize::from(d)];
        let code = if parity[i] {
            // G = reversed complement of L.
            (!l & 0x7F).reverse_bits() >> 1
        } else {
            l
        };
        push_bits(&mut body, code);
    }
    body.extend([false, true, false, true, false]);
    for &d in payload[7..12].iter().chain(std::iter::once(&check)) {
        push_bits(&mut body, !EAN_L[usize::from(d)] & 0x7F);
    }
    body.extend([true, false, true]);
    Ok(with_quiet_zone(body))
}

// ── Code 39 ─────────────────────────────────────────────────────────────

const CODE39_ALPHABET: &str = "0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ-. $/+%*";

/// Nine elements per character, most significant bit first; a set bit is
/// a wide element.
const CODE39_MASKS: [u16; 44] = [
    0x034, 0x121, 0x061, 0x160, 0x031, 0x130, 0x070, 0x025, 0x124, 0x064, // 0-9
    0x109, 0x049, 0x148, 0x019, 0x118, 0x058, 0x00D, 0x10C, 0x04C, 0x01C, // A-J
    0x103, 0x043, 0x142, 0x013, 0x112, 0x052, 0x007, 0x106, 0x046, 0x016, // K-T
    0x181, 0x0C1, 0x1C0, 0x091, 0x190, 0x0D0, // U-Z
    0x085, 0x184, 0x0C4, 0x0A8, 0x0A2, 0x08A, 0x02A, 0x094,
];

const CODE39_WIDE: u8 = 3;

fn code39_mask(c: char) -> Option<u16> {
    CODE39_ALPHABET.find(c).map(|i| CODE39_MASKS[i])
}

fn push_code39_char(out: &mut Vec<bool>, mask: u16) {
    let widths: Vec<u8> = (0..9)
        .rev()
        .map(|i| if (mask >> i) & 1 == 1 { CODE39_WIDE } else { 1 })
        .collect();
    push_widths(out, &widths);
}

/// Code 39 framed by `*` start/stop characters, narrow inter-character gaps.
pub(crate) fn code39(data: &str) -> Result<Vec<bool>, RenderFailure> {
    let guard = code39_mask('*').unwrap_or_default();
    let mut body = Vec::new();
    push_code39_char(&mut body, guard);
    for c in data.chars() {
        let mask = match code39_mask(c) {
            Some(m) if c != '*' => m,
            _ => {
                return Err(RenderFailure::new(format!(
                    "character {c:?} cannot be encoded in Code 39"
                )));
            }
        };
        body.push(false);
        push_code39_char(&mut body, mask);
    }
    body.push(false);
    push_code39_char(&mut body, guard);
    Ok(with_quiet_zone(body))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn body(modules: &[bool]) -> &[bool] {
        &modules[QUIET_ZONE..modules.len() - QUIET_ZONE]
    }

    fn runs(modules: &[bool]) -> Vec<usize> {
        let mut out = Vec::new();
        let mut prev = None;
        for &m in modules {
            if prev == Some(m) {
                if let Some(last) = out.last_mut() {
                    *last += 1;
                }
            } else {
                out.push(1);
                prev = Some(m);
            }
        }
        out
    }

    #[test]
    fn code128_patterns_are_eleven_modules() {
        for (v, p) in CODE128_PATTERNS.iter().enumerate() {
            assert_eq!(p.iter().map(|&w| usize::from(w)).sum::<usize>(), 11, "value {v}");
            let bars: u8 = p.iter().step_by(2).sum();
            assert_eq!(bars % 2, 0, "value {v} has odd bar parity");
        }
        assert_eq!(CODE128_STOP.iter().map(|&w| usize::from(w)).sum::<usize>(), 13);
    }

    #[test]
    fn code128_set_b_length_and_check() {
        let m = code128("ABC123").unwrap();
        // start + 6 data + check = 8 symbols, plus stop.
        assert_eq!(body(&m).len(), 8 * 11 + 13);
        // (104 + 33*1 + 34*2 + 35*3 + 17*4 + 18*5 + 19*6) % 103 = 67
        let values = code128_values("ABC123").unwrap();
        let check = values
            .iter()
            .enumerate()
            .map(|(i, &v)| usize::from(v) * i.max(1))
            .sum::<usize>()
            % 103;
        assert_eq!(check, 67);
        assert!(body(&m)[0], "symbol starts with a bar");
        assert!(!m[0] && !m[m.len() - 1], "quiet zones are white");
    }

    #[test]
    fn code128_uses_set_c_for_even_digits() {
        let values = code128_values("123456").unwrap();
        assert_eq!(values, vec![CODE128_START_C, 12, 34, 56]);
        assert_eq!(code128_values("12345").unwrap()[0], CODE128_START_B);
    }

    #[test]
    fn code128_rejects_non_ascii() {
        let err = code128("café").unwrap_err();
        assert!(err.reason.contains("Code 128"));
    }

    #[test]
    fn ean13_check_digit_known_value() {
        assert_eq!(ean13_check_digit(&[5, 9, 0, 1, 2, 3, 4, 1, 2, 3, 4, 5]), 7);
        assert_eq!(ean13_check_digit(&[4, 0, 0, 6, 3, 8, 1, 3, 3, 3, 9, 3]), 1);
    }

    #[test]
    fn ean13_layout_is_95_modules() {
        let twelve = ean13("590123412345").unwrap();
        let thirteen = ean13("5901234123457").unwrap();
        assert_eq!(twelve, thirteen);
        let b = body(&twelve);
        assert_eq!(b.len(), 95);
        assert_eq!(&b[..3], &[true, false, true]);
        assert_eq!(&b[45..50], &[false, true, false, true, false]);
        assert_eq!(&b[92..], &[true, false, true]);
    }

    #[test]
    fn ean13_g_codes_are_reversed_r_codes() {
        // Digit 0 in G parity is 0100111.
        let l = EAN_L[0];
        let g = (!l & 0x7F).reverse_bits() >> 1;
        assert_eq!(g, 0b010_0111);
    }

    #[test]
    fn ean13_rejects_bad_check_digit() {
        let err = ean13("5901234123450").unwrap_err();
        assert!(err.reason.contains("check digit"));
        assert!(ean13("12345").is_err());
    }

    #[test]
    fn code39_masks_have_three_wide_elements() {
        for (c, mask) in CODE39_ALPHABET.chars().zip(CODE39_MASKS) {
            assert_eq!(mask.count_ones(), 3, "{c:?}");
        }
    }

    #[test]
    fn code39_structure() {
        let m = code39("A1").unwrap();
        let b = body(&m);
        // 4 characters * (6 narrow + 3 wide) + 3 gaps
        assert_eq!(b.len(), 4 * (6 + 3 * usize::from(CODE39_WIDE)) + 3);
        // Each character starts and ends with a bar, so every gap is its own run.
        assert_eq!(runs(b).len(), 4 * 9 + 3);
        assert!(code39("a").is_err());
        assert!(code39("A*B").is_err());
    }
}
