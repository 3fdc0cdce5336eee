pub mod src;

use internment::Intern;

pub use self::src::{SrcLoc, SrcRegion};

pub type Ident = Intern<String>;

pub fn ident(name: &str) -> Ident {
    Intern::new(name.to_string())
}

/// Integers that fit an `i32` print without a fractional part.
pub fn format_number(x: f64) -> String {
    if x.is_infinite() {
        if x > 0.0 { "Infinity".to_string() } else { "-Infinity".to_string() }
    } else if x.fract() == 0.0 && x >= i32::MIN as f64 && x <= i32::MAX as f64 {
        format!("{}", x as i32)
    } else {
        format!("{}", x)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_number() {
        assert_eq!(format_number(6.0), "6");
        assert_eq!(format_number(-3.0), "-3");
        assert_eq!(format_number(-0.0), "0");
        assert_eq!(format_number(2.5), "2.5");
        assert_eq!(format_number(1.0 / 0.0), "Infinity");
        assert_eq!(format_number(-1.0 / 0.0), "-Infinity");
        assert_eq!(format_number(0.0 / 0.0), "NaN");
    }
}
