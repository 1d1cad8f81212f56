// Querymapper - maps query result sets to rows and structs
//
//-----------------------------------------------------------------------------
// Copyright (c) 2024 querymapper developers. All rights reserved.
// This program is free software: you can modify it and/or redistribute it
// under the terms of:
//
// (i)  the Universal Permissive License v 1.0 or at your option, any
//      later version (http://oss.oracle.com/licenses/upl); and/or
//
// (ii) the Apache License v 2.0. (http://www.apache.org/licenses/LICENSE-2.0)
//-----------------------------------------------------------------------------

use crate::Error;
use crate::Result;
use std::str;

pub struct Scanner<'a> {
    chars: str::Chars<'a>,
    char: Option<char>,
    ndigits: u32,
    overflow: bool,
}

impl Scanner<'_> {
    pub fn new(s: &str) -> Scanner<'_> {
        let mut chars = s.chars();
        let char = chars.next();
        Scanner {
            chars,
            char,
            ndigits: 0,
            overflow: false,
        }
    }

    pub fn next(&mut self) -> Option<char> {
        self.char = self.chars.next();
        self.char
    }

    pub fn char(&self) -> Option<char> {
        self.char
    }

    /// Reads decimal digits. Returns `None` when no digit is at the current position.
    /// Check `overflowed()` when the number may exceed `usize`.
    pub fn read_digits(&mut self) -> Option<usize> {
        let mut num: usize = 0;
        self.ndigits = 0;
        self.overflow = false;
        while let Some(digit) = self.char.and_then(|c| c.to_digit(10)) {
            match num
                .checked_mul(10)
                .and_then(|n| n.checked_add(digit as usize))
            {
                Some(n) => num = n,
                None => self.overflow = true,
            }
            self.next();
            self.ndigits += 1;
        }
        if self.ndigits > 0 {
            Some(num)
        } else {
            None
        }
    }

    pub fn overflowed(&self) -> bool {
        self.overflow
    }
}

/// Parses a column name made of one or more ASCII digits.
///
/// Returns `None` when the name is not numeric and an error of
/// `OutOfRange` when the number doesn't fit in `usize`.
pub fn parse_numeric_name(name: &str) -> Option<Result<usize>> {
    let mut s = Scanner::new(name);
    let num = s.read_digits()?;
    if s.char().is_some() {
        return None;
    }
    if s.overflowed() {
        Some(Err(Error::out_of_range(format!(
            "numeric column name {} is too large for an index",
            name
        ))))
    } else {
        Some(Ok(num))
    }
}

/// Compares column and field names case-insensitively.
pub fn names_match(lhs: &str, rhs: &str) -> bool {
    if lhs.is_ascii() && rhs.is_ascii() {
        lhs.eq_ignore_ascii_case(rhs)
    } else {
        lhs.to_lowercase() == rhs.to_lowercase()
    }
}

pub fn set_hex_string(s: &mut String, bytes: &[u8]) {
    let to_hex = |x| {
        if x < 10 {
            (b'0' + x) as char
        } else {
            (b'A' + (x - 10)) as char
        }
    };
    for byte in bytes {
        s.push(to_hex(byte >> 4));
        s.push(to_hex(byte & 0xF));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorKind;

    #[test]
    fn numeric_names() {
        assert_eq!(parse_numeric_name("3").unwrap().unwrap(), 3);
        assert_eq!(parse_numeric_name("0042").unwrap().unwrap(), 42);
        assert!(parse_numeric_name("").is_none());
        assert!(parse_numeric_name("3a").is_none());
        assert!(parse_numeric_name("a3").is_none());
        assert!(parse_numeric_name("-3").is_none());
        assert!(parse_numeric_name(" 3").is_none());
        assert!(parse_numeric_name("٣").is_none());
        let err = parse_numeric_name("99999999999999999999999999").unwrap().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::OutOfRange);
    }

    #[test]
    fn case_insensitive_names() {
        assert!(names_match("EmpNo", "EMPNO"));
        assert!(!names_match("straße", "STRASSE"));
        assert!(names_match("Ärger", "äRGER"));
        assert!(!names_match("id", "ids"));
    }

    #[test]
    fn hex_string() {
        let mut s = String::new();
        set_hex_string(&mut s, &[0x01, 0xab, 0xff]);
        assert_eq!(s, "01ABFF");
    }
}
