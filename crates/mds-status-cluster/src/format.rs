//! Compact number formatting for status tables.

const UNITS: [char; 6] = [' ', 'k', 'M', 'G', 'T', 'P'];

fn digits(v: u64) -> usize {
    v.to_string().len()
}

/// Format a non-negative number without units so it fits `width`
/// characters, substituting a scale suffix when needed.
///
/// The last character is always the suffix (a space for unscaled values),
/// so the numeric part gets `width - 1` characters.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn format_dimless(n: f64, width: usize) -> String {
    let width = width.max(2);

    let mut unit = 0u32;
    while (unit as usize) + 1 < UNITS.len()
        && digits(n as u64 / 1000u64.pow(unit)) > width - 1
    {
        unit += 1;
    }

    if unit > 0 {
        let scaled = n / 1000f64.powi(unit as i32);
        let mut truncated: String = format!("{scaled:.6}").chars().take(width - 1).collect();
        if truncated.ends_with('.') {
            truncated.pop();
            truncated.insert(0, ' ');
        }
        format!("{truncated}{}", UNITS[unit as usize])
    } else {
        format!("{:>w$} ", n as u64, w = width - 1)
    }
}
