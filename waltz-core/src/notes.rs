//! Note names and the fixed pitch table.
//!
//! The table covers the naturals from C2 to G5, which is every pitch the
//! bundled scores touch. Frequencies are equal-tempered (A4 = 440 Hz) and
//! rounded to two decimals.
//!
//! Lookups never fail loudly: a name that is not in the table yields `None`
//! and callers skip the event.

use core::fmt;

/// Note letter, A–G.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Letter { C, D, E, F, G, A, B }

impl Letter {
    #[inline]
    fn from_ascii(c: u8) -> Option<Self> {
        Some(match c {
            b'C' => Letter::C,
            b'D' => Letter::D,
            b'E' => Letter::E,
            b'F' => Letter::F,
            b'G' => Letter::G,
            b'A' => Letter::A,
            b'B' => Letter::B,
            _ => return None,
        })
    }

    /// Semitone offset above C in the same octave.
    #[inline]
    pub fn semitone(self) -> i32 {
        match self {
            Letter::C => 0,
            Letter::D => 2,
            Letter::E => 4,
            Letter::F => 5,
            Letter::G => 7,
            Letter::A => 9,
            Letter::B => 11,
        }
    }

    fn as_char(self) -> char {
        match self {
            Letter::C => 'C',
            Letter::D => 'D',
            Letter::E => 'E',
            Letter::F => 'F',
            Letter::G => 'G',
            Letter::A => 'A',
            Letter::B => 'B',
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Accidental { Natural, Sharp, Flat }

/// A parsed note name such as `C4`, `F#3` or `Bb2`.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct NoteName {
    pub letter: Letter,
    pub accidental: Accidental,
    pub octave: u8,
}

impl NoteName {
    /// Parse `<letter>[#|b]<octave digit>`. Returns `None` on anything else.
    pub fn parse(s: &str) -> Option<Self> {
        let b = s.as_bytes();
        let (letter, rest) = (Letter::from_ascii(*b.first()?)?, &b[1..]);
        let (accidental, rest) = match rest.first() {
            Some(b'#') => (Accidental::Sharp, &rest[1..]),
            Some(b'b') => (Accidental::Flat, &rest[1..]),
            _ => (Accidental::Natural, rest),
        };
        match rest {
            [d @ b'0'..=b'9'] => Some(Self { letter, accidental, octave: d - b'0' }),
            _ => None,
        }
    }

    /// MIDI note number (C4 = 60).
    pub fn midi(self) -> i32 {
        let acc = match self.accidental {
            Accidental::Natural => 0,
            Accidental::Sharp => 1,
            Accidental::Flat => -1,
        };
        (i32::from(self.octave) + 1) * 12 + self.letter.semitone() + acc
    }

    /// Frequency from the fixed table, if this pitch is in it.
    pub fn frequency(self) -> Option<f32> {
        if self.accidental != Accidental::Natural {
            return None;
        }
        NOTE_TABLE
            .iter()
            .find(|(n, _)| NoteName::parse(n) == Some(self))
            .map(|&(_, hz)| hz)
    }
}

impl fmt::Display for NoteName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let acc = match self.accidental {
            Accidental::Natural => "",
            Accidental::Sharp => "#",
            Accidental::Flat => "b",
        };
        write!(f, "{}{}{}", self.letter.as_char(), acc, self.octave)
    }
}

/// Fixed pitch table, C2..G5 naturals.
pub const NOTE_TABLE: [(&str, f32); 26] = [
    ("C2", 65.41), ("D2", 73.42), ("E2", 82.41), ("F2", 87.31), ("G2", 98.00), ("A2", 110.00), ("B2", 123.47),
    ("C3", 130.81), ("D3", 146.83), ("E3", 164.81), ("F3", 174.61), ("G3", 196.00), ("A3", 220.00), ("B3", 246.94),
    ("C4", 261.63), ("D4", 293.66), ("E4", 329.63), ("F4", 349.23), ("G4", 392.00), ("A4", 440.00), ("B4", 493.88),
    ("C5", 523.25), ("D5", 587.33), ("E5", 659.25), ("F5", 698.46), ("G5", 783.99),
];

/// Look up a note name (exact spelling, e.g. `"C4"`) in the pitch table.
#[inline]
pub fn frequency(name: &str) -> Option<f32> {
    NOTE_TABLE.iter().find(|(n, _)| *n == name).map(|&(_, hz)| hz)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn lookup_is_stable() {
        for (name, hz) in NOTE_TABLE {
            assert_eq!(frequency(name), Some(hz));
            assert_eq!(frequency(name), frequency(name));
        }
    }

    #[test]
    fn unknown_names_resolve_to_none() {
        for name in ["H4", "C9", "", "c4", "C#4", "C44", "A"] {
            assert_eq!(frequency(name), None, "{name}");
        }
    }

    #[test]
    fn table_matches_equal_temperament() {
        for (name, hz) in NOTE_TABLE {
            let n = NoteName::parse(name).unwrap();
            let et = 440.0_f32 * 2.0_f32.powf((n.midi() - 69) as f32 / 12.0);
            assert_relative_eq!(hz, et, max_relative = 1e-3);
        }
    }

    #[test]
    fn parse_accidentals_and_display() {
        let n = NoteName::parse("F#3").unwrap();
        assert_eq!(n.accidental, Accidental::Sharp);
        assert_eq!(n.midi(), 54);
        assert_eq!(NoteName::parse("Bb2").unwrap().midi(), 46);
        assert_eq!(NoteName::parse("C4").unwrap().midi(), 60);
        assert!(NoteName::parse("X4").is_none());
        assert!(NoteName::parse("C#").is_none());
    }

    #[test]
    fn sharps_are_valid_syntax_but_not_in_table() {
        let n = NoteName::parse("C#4").unwrap();
        assert_eq!(n.frequency(), None);
        assert_eq!(NoteName::parse("A4").unwrap().frequency(), Some(440.0));
    }
}
