//! Supported formats and magic-byte detection.

/// A byte-prefix signature: the input matches when every unmasked pattern
/// byte equals the corresponding leading input byte.
///
/// A mask byte of `0x00` wildcards its position (the RIFF size field in the
/// WebP signatures, for example).
#[derive(Clone, Copy, Debug)]
pub struct Signature {
    pub pattern: &'static [u8],
    pub mask: &'static [u8],
}

impl Signature {
    /// Test this signature against the leading bytes of `data`.
    pub fn matches(&self, data: &[u8]) -> bool {
        if data.len() < self.pattern.len() {
            return false;
        }
        self.pattern
            .iter()
            .zip(self.mask)
            .zip(data)
            .all(|((&p, &m), &b)| b & m == p & m)
    }
}

const EXACT_3: &[u8] = &[0xFF; 3];
const EXACT_8: &[u8] = &[0xFF; 8];
const EXACT_16: &[u8] = &[0xFF; 16];

// RIFF container: bytes 4..8 hold the chunk size and are wildcarded.
const RIFF_16: &[u8] = &[
    0xFF, 0xFF, 0xFF, 0xFF, 0x00, 0x00, 0x00, 0x00, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF,
];

/// Supported codecs, in registry order.
///
/// Detection tests signatures in this declaration order; the reference
/// formats have disjoint magic bytes, so the order only resolves ties.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Codec {
    MozJpeg,
    WebP,
    Avif,
    Jxl,
    Wp2,
    OxiPng,
}

impl Codec {
    /// All codecs, in registry order.
    pub const ALL: [Codec; 6] = [
        Codec::MozJpeg,
        Codec::WebP,
        Codec::Avif,
        Codec::Jxl,
        Codec::Wp2,
        Codec::OxiPng,
    ];

    /// Registry key.
    pub fn key(self) -> &'static str {
        match self {
            Codec::MozJpeg => "mozjpeg",
            Codec::WebP => "webp",
            Codec::Avif => "avif",
            Codec::Jxl => "jxl",
            Codec::Wp2 => "wp2",
            Codec::OxiPng => "oxipng",
        }
    }

    /// Look up a codec by registry key.
    pub fn from_key(key: &str) -> Option<Self> {
        Codec::ALL.into_iter().find(|c| c.key() == key)
    }

    /// Display name.
    pub fn name(self) -> &'static str {
        match self {
            Codec::MozJpeg => "MozJPEG",
            Codec::WebP => "WebP",
            Codec::Avif => "AVIF",
            Codec::Jxl => "JPEG-XL",
            Codec::Wp2 => "WebP2",
            Codec::OxiPng => "OxiPNG",
        }
    }

    /// Output file extension.
    pub fn extension(self) -> &'static str {
        match self {
            Codec::MozJpeg => "jpg",
            Codec::WebP => "webp",
            Codec::Avif => "avif",
            Codec::Jxl => "jxl",
            Codec::Wp2 => "wp2",
            Codec::OxiPng => "png",
        }
    }

    /// Ordered byte-signature detectors for this codec.
    ///
    /// WebP contributes one signature per container subtype byte
    /// (`VP8 `, `VP8L`, `VP8X`).
    pub fn signatures(self) -> &'static [Signature] {
        match self {
            Codec::MozJpeg => &[Signature {
                pattern: &[0xFF, 0xD8, 0xFF],
                mask: EXACT_3,
            }],
            Codec::WebP => &[
                Signature {
                    pattern: b"RIFF\x00\x00\x00\x00WEBPVP8 ",
                    mask: RIFF_16,
                },
                Signature {
                    pattern: b"RIFF\x00\x00\x00\x00WEBPVP8L",
                    mask: RIFF_16,
                },
                Signature {
                    pattern: b"RIFF\x00\x00\x00\x00WEBPVP8X",
                    mask: RIFF_16,
                },
            ],
            Codec::Avif => &[Signature {
                pattern: b"\x00\x00\x00 ftypavif\x00\x00\x00\x00",
                mask: EXACT_16,
            }],
            Codec::Jxl => &[Signature {
                pattern: &[0xFF, 0x0A],
                mask: &[0xFF, 0xFF],
            }],
            Codec::Wp2 => &[Signature {
                pattern: &[0xF4, 0xFF, 0x6F],
                mask: EXACT_3,
            }],
            Codec::OxiPng => &[Signature {
                pattern: &[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A],
                mask: EXACT_8,
            }],
        }
    }

    /// Detect the codec for encoded bytes from its magic-byte signature.
    ///
    /// Tests each codec's signatures in registry order and returns the first
    /// match, or `None` if nothing matched.
    pub fn detect(data: &[u8]) -> Option<Codec> {
        Codec::ALL
            .into_iter()
            .find(|codec| codec.signatures().iter().any(|sig| sig.matches(data)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detect_jpeg() {
        let data = [0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10];
        assert_eq!(Codec::detect(&data), Some(Codec::MozJpeg));
    }

    #[test]
    fn detect_webp_subtypes() {
        for subtype in [&b"VP8 "[..], b"VP8L", b"VP8X"] {
            let mut data = Vec::new();
            data.extend_from_slice(b"RIFF");
            data.extend_from_slice(&1234u32.to_le_bytes());
            data.extend_from_slice(b"WEBP");
            data.extend_from_slice(subtype);
            assert_eq!(Codec::detect(&data), Some(Codec::WebP), "{subtype:?}");
        }
    }

    #[test]
    fn detect_webp_rejects_unknown_subtype() {
        let mut data = Vec::new();
        data.extend_from_slice(b"RIFF\x00\x00\x00\x00WEBPVP9 ");
        assert_eq!(Codec::detect(&data), None);
    }

    #[test]
    fn detect_avif() {
        let data = b"\x00\x00\x00 ftypavif\x00\x00\x00\x00\x00\x00";
        assert_eq!(Codec::detect(data), Some(Codec::Avif));
    }

    #[test]
    fn detect_jxl() {
        assert_eq!(Codec::detect(&[0xFF, 0x0A]), Some(Codec::Jxl));
    }

    #[test]
    fn detect_wp2() {
        assert_eq!(Codec::detect(&[0xF4, 0xFF, 0x6F, 0x00]), Some(Codec::Wp2));
    }

    #[test]
    fn detect_png() {
        let data = [
            0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0x00, 0x00, 0x00, 0x0D,
        ];
        assert_eq!(Codec::detect(&data), Some(Codec::OxiPng));
    }

    #[test]
    fn detect_all_zero_buffer() {
        assert_eq!(Codec::detect(&[0u8; 64]), None);
    }

    #[test]
    fn detect_empty_and_truncated() {
        assert_eq!(Codec::detect(&[]), None);
        // One byte short of the JPEG signature.
        assert_eq!(Codec::detect(&[0xFF, 0xD8]), None);
    }

    #[test]
    fn signature_wildcard_ignores_size_field() {
        let sig = Codec::WebP.signatures()[0];
        let mut data = b"RIFF\xDE\xAD\xBE\xEFWEBPVP8 ".to_vec();
        assert!(sig.matches(&data));
        data[9] = b'e';
        assert!(!sig.matches(&data));
    }

    #[test]
    fn key_round_trip() {
        for codec in Codec::ALL {
            assert_eq!(Codec::from_key(codec.key()), Some(codec));
        }
        assert_eq!(Codec::from_key("tiff"), None);
    }

    #[test]
    fn extensions() {
        assert_eq!(Codec::MozJpeg.extension(), "jpg");
        assert_eq!(Codec::OxiPng.extension(), "png");
        assert_eq!(Codec::Wp2.extension(), "wp2");
    }
}
