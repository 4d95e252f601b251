// Corpusbench - CPU vs GPU Corpus Statistics
//
// Copyright (c) 2025 Dweve IP B.V. and individual contributors.
//
// SPDX-License-Identifier: Apache-2.0
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License in the LICENSE file at the
// root of this repository or at: http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Character distribution.
//!
//! The CPU path counts Unicode scalar values and classifies each one into at
//! most one class: letter (general category L*), digit (decimal digits plus
//! digit-valued forms such as superscripts) or space. The device path counts
//! UTF-8 bytes and classifies them by ASCII range. The two histograms are
//! different types and their totals differ whenever the corpus contains
//! non-ASCII text.

use super::Timed;
use crate::core::Stopwatch;
use crate::device::Device;
use crate::Result;
use std::collections::HashMap;
use unicode_normalization::char::is_combining_mark;

/// First code point of every run of ten decimal digits (category Nd).
const DECIMAL_ZEROS: &[u32] = &[
    0x0030, 0x0660, 0x06F0, 0x07C0, 0x0966, 0x09E6, 0x0A66, 0x0AE6, 0x0B66, 0x0BE6, 0x0C66,
    0x0CE6, 0x0D66, 0x0DE6, 0x0E50, 0x0ED0, 0x0F20, 0x1040, 0x1090, 0x17E0, 0x1810, 0x1946,
    0x19D0, 0x1A80, 0x1A90, 0x1B50, 0x1BB0, 0x1C40, 0x1C50, 0xA620, 0xA8D0, 0xA900, 0xA9D0,
    0xA9F0, 0xAA50, 0xABF0, 0xFF10, 0x104A0, 0x10D30, 0x11066, 0x110F0, 0x11136, 0x111D0,
    0x112F0, 0x11450, 0x114D0, 0x11650, 0x116C0, 0x11730, 0x118E0, 0x11950, 0x11C50, 0x11D50,
    0x11DA0, 0x11F50, 0x16A60, 0x16AC0, 0x16B50, 0x1D7CE, 0x1D7D8, 0x1D7E2, 0x1D7EC, 0x1D7F6,
    0x1E140, 0x1E2F0, 0x1E4F0, 0x1E950, 0x1FBF0,
];

/// Digit-valued forms outside Nd: superscripts, subscripts, circled and
/// parenthesized digits, and similar.
const DIGIT_FORMS: &[(u32, u32)] = &[
    (0x00B2, 0x00B3),
    (0x00B9, 0x00B9),
    (0x1369, 0x1371),
    (0x19DA, 0x19DA),
    (0x2070, 0x2070),
    (0x2074, 0x2079),
    (0x2080, 0x2089),
    (0x2460, 0x2468),
    (0x2474, 0x247C),
    (0x2488, 0x2490),
    (0x24EA, 0x24EA),
    (0x24F5, 0x24FD),
    (0x24FF, 0x24FF),
    (0x2776, 0x277E),
    (0x2780, 0x2788),
    (0x278A, 0x2792),
    (0x10A40, 0x10A43),
    (0x10E60, 0x10E68),
    (0x11052, 0x1105A),
    (0x1F100, 0x1F10A),
];

/// Alphabetic symbols (category So): circled, squared and negative Latin
/// letters.
const LETTER_SYMBOLS: &[(u32, u32)] = &[
    (0x24B6, 0x24E9),
    (0x1F130, 0x1F149),
    (0x1F150, 0x1F169),
    (0x1F170, 0x1F189),
];

fn in_ranges(c: char, ranges: &[(u32, u32)]) -> bool {
    let cp = c as u32;
    ranges.iter().any(|&(lo, hi)| (lo..=hi).contains(&cp))
}

/// True for letters: the Alphabetic property minus letter numbers, marks
/// and alphabetic symbols.
pub fn is_letter(c: char) -> bool {
    c.is_alphabetic()
        && !c.is_numeric()
        && !is_combining_mark(c)
        && !in_ranges(c, LETTER_SYMBOLS)
}

/// True for decimal digits and digit-valued forms. Fractions and letter
/// numbers such as `½` and `Ⅻ` are not digits.
pub fn is_digit(c: char) -> bool {
    if c.is_ascii_digit() {
        return true;
    }
    if !c.is_numeric() {
        return false;
    }
    let cp = c as u32;
    DECIMAL_ZEROS
        .iter()
        .any(|&zero| (zero..zero + 10).contains(&cp))
        || in_ranges(c, DIGIT_FORMS)
}

/// Codepoint histogram.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CharHistogram {
    counts: HashMap<char, u64>,
}

impl CharHistogram {
    /// Counts every character yielded by `chars`.
    pub fn from_chars(chars: impl Iterator<Item = char>) -> Self {
        let mut counts = HashMap::new();
        for c in chars {
            *counts.entry(c).or_insert(0) += 1;
        }
        Self { counts }
    }

    /// Occurrences of `c`.
    pub fn get(&self, c: char) -> u64 {
        self.counts.get(&c).copied().unwrap_or(0)
    }

    /// Distinct characters.
    pub fn unique(&self) -> usize {
        self.counts.len()
    }

    /// Total characters.
    pub fn total(&self) -> u64 {
        self.counts.values().sum()
    }

    /// Iterates `(char, count)` pairs in no particular order.
    pub fn iter(&self) -> impl Iterator<Item = (char, u64)> + '_ {
        self.counts.iter().map(|(&c, &n)| (c, n))
    }
}

/// Byte-value histogram.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ByteHistogram {
    counts: [u64; 256],
}

impl Default for ByteHistogram {
    fn default() -> Self {
        Self { counts: [0; 256] }
    }
}

impl ByteHistogram {
    /// Builds a histogram from compact `(byte, count)` pairs.
    pub fn from_pairs(pairs: &[(u8, u64)]) -> Self {
        let mut histogram = Self::default();
        for &(byte, count) in pairs {
            histogram.counts[byte as usize] += count;
        }
        histogram
    }

    /// Occurrences of `byte`.
    pub fn get(&self, byte: u8) -> u64 {
        self.counts[byte as usize]
    }

    /// Distinct byte values.
    pub fn unique(&self) -> usize {
        self.counts.iter().filter(|&&n| n > 0).count()
    }

    /// Total bytes.
    pub fn total(&self) -> u64 {
        self.counts.iter().sum()
    }

    /// Iterates non-zero `(byte, count)` pairs in ascending byte order.
    pub fn iter(&self) -> impl Iterator<Item = (u8, u64)> + '_ {
        (0..=u8::MAX)
            .zip(self.counts.iter())
            .filter(|&(_, &n)| n > 0)
            .map(|(b, &n)| (b, n))
    }
}

/// Letter, digit, and space counts for one histogram.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ClassCounts {
    /// Units counted.
    pub total: u64,
    /// Distinct units.
    pub unique: usize,
    /// Letters.
    pub letters: u64,
    /// Digits.
    pub digits: u64,
    /// Space characters (U+0020 only).
    pub spaces: u64,
}

impl ClassCounts {
    fn pct(&self, n: u64) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            100.0 * n as f64 / self.total as f64
        }
    }

    /// Letters as a percentage of the total.
    pub fn letter_pct(&self) -> f64 {
        self.pct(self.letters)
    }

    /// Digits as a percentage of the total.
    pub fn digit_pct(&self) -> f64 {
        self.pct(self.digits)
    }

    /// Spaces as a percentage of the total.
    pub fn space_pct(&self) -> f64 {
        self.pct(self.spaces)
    }
}

/// CPU character distribution.
#[derive(Debug, Clone, PartialEq)]
pub struct CharDistribution {
    /// Codepoint histogram.
    pub histogram: CharHistogram,
    /// Classification summary.
    pub classes: ClassCounts,
}

impl CharDistribution {
    /// Classifies a codepoint histogram.
    pub fn classify(histogram: CharHistogram) -> Self {
        let mut classes = ClassCounts {
            total: histogram.total(),
            unique: histogram.unique(),
            ..ClassCounts::default()
        };
        for (c, n) in histogram.iter() {
            if is_letter(c) {
                classes.letters += n;
            } else if is_digit(c) {
                classes.digits += n;
            } else if c == ' ' {
                classes.spaces += n;
            }
        }
        Self { histogram, classes }
    }
}

/// Device byte distribution.
#[derive(Debug, Clone, PartialEq)]
pub struct ByteDistribution {
    /// Byte histogram.
    pub histogram: ByteHistogram,
    /// Classification summary.
    pub classes: ClassCounts,
}

impl ByteDistribution {
    /// Classifies a byte histogram by ASCII range.
    pub fn classify(histogram: ByteHistogram) -> Self {
        let mut classes = ClassCounts {
            total: histogram.total(),
            unique: histogram.unique(),
            ..ClassCounts::default()
        };
        for (b, n) in histogram.iter() {
            match b {
                b'A'..=b'Z' | b'a'..=b'z' => classes.letters += n,
                b'0'..=b'9' => classes.digits += n,
                b' ' => classes.spaces += n,
                _ => {}
            }
        }
        Self { histogram, classes }
    }
}

/// Counts characters across all of `texts` as one stream.
pub fn char_distribution_cpu<S: AsRef<str>>(texts: &[S]) -> Timed<CharDistribution> {
    let stopwatch = Stopwatch::start();
    let histogram = CharHistogram::from_chars(texts.iter().flat_map(|t| t.as_ref().chars()));
    let distribution = CharDistribution::classify(histogram);
    Timed::new(distribution, stopwatch.stop())
}

/// Counts UTF-8 bytes across all of `texts` on the device.
///
/// The timed region covers encoding, transfer, the unique-with-counts
/// reduction, the compact download, and classification.
///
/// # Errors
///
/// [`BenchError::Device`](crate::BenchError::Device) when a transfer or
/// kernel fails.
pub fn byte_distribution_gpu<S: AsRef<str>>(
    texts: &[S],
    device: &dyn Device,
) -> Result<Timed<ByteDistribution>> {
    let stopwatch = Stopwatch::start();

    let size: usize = texts.iter().map(|t| t.as_ref().len()).sum();
    let mut stream = Vec::with_capacity(size);
    for text in texts {
        stream.extend_from_slice(text.as_ref().as_bytes());
    }

    let array = device.upload_bytes(&stream)?;
    let pending = device.unique_counts(&array)?;
    device.synchronize()?;
    let pairs = pending.read()?;
    drop(array);

    let distribution = ByteDistribution::classify(ByteHistogram::from_pairs(&pairs));
    Ok(Timed::new(distribution, stopwatch.stop()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::HostParallelDevice;

    #[test]
    fn test_cpu_classification() {
        let classes = char_distribution_cpu(&["ab12 "]).value.classes;
        assert_eq!(classes.total, 5);
        assert_eq!(classes.letters, 2);
        assert_eq!(classes.digits, 2);
        assert_eq!(classes.spaces, 1);
        assert_eq!(classes.unique, 5);
        let pct = classes.letter_pct() + classes.digit_pct() + classes.space_pct();
        assert!(pct <= 100.0 + 1e-9);
    }

    #[test]
    fn test_gpu_classification() {
        let device = HostParallelDevice::new(2).unwrap();
        let classes = byte_distribution_gpu(&["ab12 "], &device).unwrap().value.classes;
        assert_eq!(classes.total, 5);
        assert_eq!(classes.letters, 2);
        assert_eq!(classes.digits, 2);
        assert_eq!(classes.spaces, 1);
        assert_eq!(device.memory_in_use(), 0);
    }

    #[test]
    fn test_texts_form_one_stream() {
        let dist = char_distribution_cpu(&["aa", "ab"]).value;
        assert_eq!(dist.histogram.get('a'), 3);
        assert_eq!(dist.histogram.get('b'), 1);
        assert_eq!(dist.histogram.unique(), 2);
    }

    #[test]
    fn test_multibyte_discrepancy_preserved() {
        let texts = ["café 9"];
        let device = HostParallelDevice::new(2).unwrap();
        let cpu = char_distribution_cpu(&texts).value.classes;
        let gpu = byte_distribution_gpu(&texts, &device).unwrap().value.classes;

        assert_eq!(cpu.total, 6);
        assert_eq!(gpu.total, 7);
        assert_eq!(cpu.letters, 4);
        // 'é' is two non-ASCII bytes, neither counted as a letter.
        assert_eq!(gpu.letters, 3);
        assert_eq!(cpu.digits, gpu.digits);
        assert_eq!(cpu.spaces, gpu.spaces);
    }

    #[test]
    fn test_unicode_predicates() {
        let classes = char_distribution_cpu(&["Ωж٣\t"]).value.classes;
        assert_eq!(classes.letters, 2);
        assert_eq!(classes.digits, 1);
        assert_eq!(classes.spaces, 0);
    }

    #[test]
    fn test_number_forms_counted_once() {
        let classes = char_distribution_cpu(&["ⅫⅫ½²"]).value.classes;
        assert_eq!(classes.total, 4);
        // Letter numbers and fractions are neither letters nor digits.
        assert_eq!(classes.letters, 0);
        assert_eq!(classes.digits, 1);
        assert!(classes.letters + classes.digits + classes.spaces <= classes.total);
        assert!(classes.letter_pct() + classes.digit_pct() + classes.space_pct() <= 100.0);
    }

    #[test]
    fn test_letter_predicate() {
        assert!(is_letter('a'));
        assert!(is_letter('ǅ'));
        assert!(is_letter('ʰ'));
        assert!(is_letter('中'));
        assert!(!is_letter('Ⅻ'));
        assert!(!is_letter('Ⓐ'));
        // Devanagari vowel sign: alphabetic, but a combining mark.
        assert!(!is_letter('\u{093E}'));
    }

    #[test]
    fn test_digit_predicate() {
        assert!(is_digit('7'));
        assert!(is_digit('٣'));
        assert!(is_digit('９'));
        assert!(is_digit('²'));
        assert!(is_digit('₃'));
        assert!(is_digit('①'));
        assert!(!is_digit('½'));
        assert!(!is_digit('Ⅻ'));
        assert!(!is_digit('⑩'));
        assert!(!is_digit('x'));
    }

    #[test]
    fn test_byte_histogram_pairs() {
        let histogram = ByteHistogram::from_pairs(&[(b'a', 3), (0xC3, 1)]);
        assert_eq!(histogram.get(b'a'), 3);
        assert_eq!(histogram.total(), 4);
        assert_eq!(histogram.unique(), 2);
        assert_eq!(histogram.iter().collect::<Vec<_>>(), vec![(b'a', 3), (0xC3, 1)]);
    }

    #[test]
    fn test_empty_percentages() {
        let classes = ClassCounts::default();
        assert_eq!(classes.letter_pct(), 0.0);
        assert_eq!(classes.space_pct(), 0.0);
    }
}
