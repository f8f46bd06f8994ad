use std::fs;
use std::path::Path;

use crate::bits::concat16;
use crate::error::RomError;
use crate::memory::MemoryDevice;

/// Smallest image that can carry a header: one LoROM bank.
const MIN_IMAGE_SIZE: usize = 0x8000;
const COPIER_HEADER_SIZE: usize = 512;

const LOROM_HEADER: usize = 0x7FC0;
const HIROM_HEADER: usize = 0xFFC0;
const EXHIROM_HEADER: usize = 0x40FFC0;
const HEADER_LEN: usize = 0x40;
const TITLE_LEN: usize = 21;

/// Headers scoring below this are not trusted and the image is rejected.
const MIN_HEADER_SCORE: u32 = 10;

/// How the cartridge ROM is laid out across banks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MapType {
    LoRom,
    HiRom,
    ExHiRom,
    /// Image did not contain a recognisable header.
    Invalid,
}

#[derive(Debug, Clone)]
pub struct CartridgeHeader {
    pub title: String,
    pub map_mode: u8,
    pub rom_type: u8,
    pub rom_size: usize,
    pub ram_size: usize,
    pub country: u8,
    pub developer: u8,
    pub version: u8,
    pub checksum: u16,
    pub checksum_complement: u16,
}

impl CartridgeHeader {
    fn parse(rom: &[u8], base: usize) -> Self {
        let h = &rom[base..base + HEADER_LEN];
        CartridgeHeader {
            title: extract_title(&h[..TITLE_LEN]),
            map_mode: h[0x15],
            rom_type: h[0x16],
            rom_size: decode_rom_size(h[0x17]),
            ram_size: decode_ram_size(h[0x18]),
            country: h[0x19],
            developer: h[0x1A],
            version: h[0x1B],
            checksum_complement: concat16(h[0x1D], h[0x1C]),
            checksum: concat16(h[0x1F], h[0x1E]),
        }
    }

    pub fn checksum_valid(&self) -> bool {
        self.checksum ^ self.checksum_complement == 0xFFFF
    }
}

/// Cartridge ROM plus the metadata derived from its header.
pub struct Rom {
    data: Vec<u8>,
    map_type: MapType,
    header: Option<CartridgeHeader>,
    has_copier_header: bool,
    checksum: u16,
}

impl Default for Rom {
    fn default() -> Self {
        Self::new()
    }
}

impl Rom {
    pub fn new() -> Self {
        Rom {
            data: Vec::new(),
            map_type: MapType::Invalid,
            header: None,
            has_copier_header: false,
            checksum: 0,
        }
    }

    /// Loads an image from disk.
    ///
    /// I/O failures and images too short to hold a header are errors. A
    /// readable image without a recognisable header loads as
    /// [`MapType::Invalid`]; callers must check before mapping it.
    pub fn load<P: AsRef<Path>>(&mut self, path: P) -> Result<MapType, RomError> {
        let data = match fs::read(path.as_ref()) {
            Ok(d) => d,
            Err(e) => {
                self.unload();
                return Err(e.into());
            }
        };
        self.load_bytes(data)
    }

    pub fn load_bytes(&mut self, mut data: Vec<u8>) -> Result<MapType, RomError> {
        self.unload();

        let has_copier_header = data.len() % 1024 == COPIER_HEADER_SIZE;
        if has_copier_header {
            data.drain(..COPIER_HEADER_SIZE);
        }
        if data.len() < MIN_IMAGE_SIZE {
            return Err(RomError::Truncated { len: data.len() });
        }

        let (map_type, header) = match detect_layout(&data) {
            Some((map_type, base)) => (map_type, Some(CartridgeHeader::parse(&data, base))),
            None => {
                log::warn!("no plausible cartridge header found; image classified invalid");
                (MapType::Invalid, None)
            }
        };

        if let Some(h) = &header {
            log::info!(
                "loaded {:?} cartridge \"{}\" ({} KiB, SRAM {} KiB)",
                map_type,
                h.title,
                data.len() / 1024,
                h.ram_size / 1024
            );
            if !h.checksum_valid() {
                log::warn!(
                    "header checksum pair {:04X}/{:04X} is inconsistent",
                    h.checksum,
                    h.checksum_complement
                );
            }
        }

        self.checksum = calculate_checksum(&data);
        self.data = data;
        self.map_type = map_type;
        self.header = header;
        self.has_copier_header = has_copier_header;
        Ok(map_type)
    }

    /// Drops the image; the ROM reads as unmapped afterwards.
    pub fn unload(&mut self) {
        self.data.clear();
        self.map_type = MapType::Invalid;
        self.header = None;
        self.has_copier_header = false;
        self.checksum = 0;
    }

    pub fn map_type(&self) -> MapType {
        self.map_type
    }

    pub fn is_loaded(&self) -> bool {
        self.map_type != MapType::Invalid
    }

    /// Cartridge title from the header, or an empty string.
    pub fn name(&self) -> &str {
        self.header.as_ref().map(|h| h.title.as_str()).unwrap_or("")
    }

    /// Image size in bytes (copier header excluded).
    pub fn size(&self) -> usize {
        self.data.len()
    }

    pub fn header(&self) -> Option<&CartridgeHeader> {
        self.header.as_ref()
    }

    pub fn sram_size(&self) -> usize {
        self.header.as_ref().map(|h| h.ram_size).unwrap_or(0)
    }

    pub fn has_copier_header(&self) -> bool {
        self.has_copier_header
    }

    /// 16-bit sum of every image byte.
    pub fn checksum(&self) -> u16 {
        self.checksum
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }
}

impl MemoryDevice for Rom {
    fn read_byte(&mut self, offset: u32) -> u8 {
        self.peek_byte(offset)
    }

    fn write_byte(&mut self, offset: u32, value: u8) {
        log::trace!("ignored ROM write {:02X} at offset {:06X}", value, offset);
    }

    fn peek_byte(&self, offset: u32) -> u8 {
        if self.data.is_empty() {
            return 0;
        }
        self.data[offset as usize % self.data.len()]
    }
}

fn detect_layout(rom: &[u8]) -> Option<(MapType, usize)> {
    let lorom = score_header(rom, LOROM_HEADER, MapType::LoRom);
    let hirom = score_header(rom, HIROM_HEADER, MapType::HiRom);
    let exhirom = score_header(rom, EXHIROM_HEADER, MapType::ExHiRom);

    let best = lorom.max(hirom).max(exhirom);
    if best < MIN_HEADER_SCORE {
        return None;
    }
    if exhirom == best && exhirom > hirom {
        Some((MapType::ExHiRom, EXHIROM_HEADER))
    } else if hirom == best && hirom > lorom {
        Some((MapType::HiRom, HIROM_HEADER))
    } else {
        Some((MapType::LoRom, LOROM_HEADER))
    }
}

fn score_header(rom: &[u8], base: usize, layout: MapType) -> u32 {
    if base + HEADER_LEN > rom.len() {
        return 0;
    }
    let h = &rom[base..base + HEADER_LEN];
    let mut score: u32 = 0;

    let complement = concat16(h[0x1D], h[0x1C]);
    let checksum = concat16(h[0x1F], h[0x1E]);
    if checksum ^ complement == 0xFFFF {
        score += 8;
    }

    // Map mode is 001S_MMMM: M=0 LoROM, 1 HiROM, 5 ExHiROM.
    let map_mode = h[0x15];
    let expected_mode = match layout {
        MapType::LoRom => 0x0,
        MapType::HiRom => 0x1,
        MapType::ExHiRom => 0x5,
        MapType::Invalid => return 0,
    };
    if map_mode & 0xE0 == 0x20 && map_mode & 0x0F == expected_mode {
        score += 4;
    }

    if h[0x16] <= 0x37 {
        score += 2;
    }

    let rom_size = h[0x17];
    if (0x08..=0x0D).contains(&rom_size) {
        score += 2;
        let expected = 1024usize << rom_size;
        if rom.len() >= expected / 2 && rom.len() <= expected * 2 {
            score += 2;
        }
    }

    if h[0x18] <= 0x08 {
        score += 1;
    }
    if h[0x19] <= 0x14 {
        score += 1;
    }

    if h[..TITLE_LEN]
        .iter()
        .all(|&b| (0x20..=0x7E).contains(&b) || b == 0x00)
    {
        score += 2;
    }

    // Emulation-mode reset vector must point into the ROM half of bank 0.
    let reset = concat16(h[0x3D], h[0x3C]);
    if reset >= 0x8000 {
        score += 3;
    }

    if h[0x16] == 0xFF || h[0x1A] == 0xFF {
        score = score.saturating_sub(3);
    }

    score
}

fn extract_title(bytes: &[u8]) -> String {
    let mut title = String::with_capacity(bytes.len());
    for &b in bytes {
        match b {
            0x00 => break,
            0x20..=0x7E => title.push(b as char),
            0x80..=0xFF => title.push('?'),
            _ => {}
        }
    }
    title.trim().to_string()
}

fn decode_rom_size(code: u8) -> usize {
    if code <= 0x0F {
        1024 << code
    } else {
        0
    }
}

fn decode_ram_size(code: u8) -> usize {
    // 1 << N KiB; 0 means none. Anything past 512 KiB is garbage.
    if code == 0 || code > 0x09 {
        0
    } else {
        1024 << code
    }
}

fn calculate_checksum(rom: &[u8]) -> u16 {
    rom.iter()
        .fold(0u32, |sum, &b| sum.wrapping_add(b as u32)) as u16
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Builds a 64 KiB image with a well-formed header at `base`.
    pub(crate) fn build_image(base: usize, map_mode: u8, title: &str) -> Vec<u8> {
        let mut rom = vec![0u8; 0x10000];
        let mut t = [b' '; TITLE_LEN];
        t[..title.len()].copy_from_slice(title.as_bytes());
        rom[base..base + TITLE_LEN].copy_from_slice(&t);
        rom[base + 0x15] = map_mode;
        rom[base + 0x16] = 0x02;
        rom[base + 0x17] = 0x06; // 64 KiB
        rom[base + 0x18] = 0x03; // 8 KiB SRAM
        rom[base + 0x19] = 0x01;
        rom[base + 0x1A] = 0x33;
        rom[base + 0x1C] = 0x34;
        rom[base + 0x1D] = 0x12;
        rom[base + 0x1E] = 0xCB;
        rom[base + 0x1F] = 0xED;
        rom[base + 0x3C] = 0x00;
        rom[base + 0x3D] = 0x80;
        rom
    }

    #[test]
    fn lorom_header_is_classified() {
        let mut rom = Rom::new();
        let ty = rom
            .load_bytes(build_image(LOROM_HEADER, 0x20, "BLAZE TEST CART"))
            .unwrap();
        assert_eq!(ty, MapType::LoRom);
        assert_eq!(rom.map_type(), MapType::LoRom);
        assert_eq!(rom.name(), "BLAZE TEST CART");
        assert_eq!(rom.size(), 0x10000);
        assert_eq!(rom.sram_size(), 8 * 1024);
        assert!(rom.header().unwrap().checksum_valid());
    }

    #[test]
    fn hirom_header_is_classified() {
        let mut rom = Rom::new();
        let ty = rom
            .load_bytes(build_image(HIROM_HEADER, 0x21, "HIGH"))
            .unwrap();
        assert_eq!(ty, MapType::HiRom);
        assert_eq!(rom.name(), "HIGH");
    }

    #[test]
    fn title_padding_is_trimmed() {
        let mut image = build_image(LOROM_HEADER, 0x20, "PAD");
        // NUL padding instead of spaces
        for b in &mut image[LOROM_HEADER + 3..LOROM_HEADER + TITLE_LEN] {
            *b = 0;
        }
        let mut rom = Rom::new();
        rom.load_bytes(image).unwrap();
        assert_eq!(rom.name(), "PAD");
    }

    #[test]
    fn copier_header_is_stripped() {
        let mut image = vec![0xEE; COPIER_HEADER_SIZE];
        image.extend(build_image(LOROM_HEADER, 0x20, "COPIER"));
        let mut rom = Rom::new();
        assert_eq!(rom.load_bytes(image).unwrap(), MapType::LoRom);
        assert!(rom.has_copier_header());
        assert_eq!(rom.size(), 0x10000);
        assert_eq!(rom.name(), "COPIER");
    }

    #[test]
    fn blank_image_is_invalid_not_an_error() {
        let mut rom = Rom::new();
        let ty = rom.load_bytes(vec![0u8; 0x10000]).unwrap();
        assert_eq!(ty, MapType::Invalid);
        assert_eq!(rom.map_type(), MapType::Invalid);
        assert_eq!(rom.name(), "");
    }

    #[test]
    fn short_image_is_truncated_error() {
        let mut rom = Rom::new();
        let err = rom.load_bytes(vec![0u8; 0x1000]).unwrap_err();
        assert!(matches!(err, RomError::Truncated { len: 0x1000 }));
        assert_eq!(rom.map_type(), MapType::Invalid);
    }

    #[test]
    fn missing_file_is_io_error() {
        let mut rom = Rom::new();
        let err = rom
            .load("/definitely/not/here/blaze-missing.sfc")
            .unwrap_err();
        assert!(matches!(err, RomError::Io(_)));
        assert_eq!(rom.map_type(), MapType::Invalid);
    }

    #[test]
    fn rom_ignores_writes_and_mirrors_reads() {
        let mut rom = Rom::new();
        rom.load_bytes(build_image(LOROM_HEADER, 0x20, "RO")).unwrap();
        let before = rom.read_byte(0x7FC0);
        rom.write_byte(0x7FC0, before.wrapping_add(1));
        assert_eq!(rom.read_byte(0x7FC0), before);
        assert_eq!(rom.peek_byte(0x7FC0 + 0x10000), before);
    }
}
