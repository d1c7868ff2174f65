use std::path::Path;

use chrono::NaiveDate;

use super::types::{FileType, ReadError};

pub fn reader_from_filetype(path: &Path) -> Result<FileType, ReadError> {
    match path.extension().and_then(|ext| ext.to_str()) {
        Some("tif") | Some("tiff") => Ok(FileType::GeoTiff),
        Some("nc") => Ok(FileType::NetCDF),
        _ => Err(ReadError::UnknownFileType(path.to_path_buf())),
    }
}

/// First `YYYYMMDD` run in a file or directory name, e.g. the acquisition
/// date of `S2A_MSIL2A_20200115T102401`.
pub fn date_from_name(name: &str) -> Option<NaiveDate> {
    let bytes = name.as_bytes();
    let mut start = 0;
    while start < bytes.len() {
        if !bytes[start].is_ascii_digit() {
            start += 1;
            continue;
        }
        let mut end = start;
        while end < bytes.len() && bytes[end].is_ascii_digit() {
            end += 1;
        }
        if end - start >= 8 {
            if let Ok(date) = NaiveDate::parse_from_str(&name[start..start + 8], "%Y%m%d") {
                return Some(date);
            }
        }
        start = end;
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_types() {
        assert_eq!(
            reader_from_filetype(Path::new("a/B4.tif")).unwrap(),
            FileType::GeoTiff
        );
        assert_eq!(
            reader_from_filetype(Path::new("sst.nc")).unwrap(),
            FileType::NetCDF
        );
        assert!(reader_from_filetype(Path::new("data.zarr")).is_err());
    }

    #[test]
    fn test_date_from_name() {
        assert_eq!(
            date_from_name("S2A_MSIL2A_20200115T102401_N0213"),
            NaiveDate::from_ymd_opt(2020, 1, 15)
        );
        assert_eq!(
            date_from_name("scene_2021-03-04"),
            None
        );
        assert_eq!(date_from_name("v2_99999999_20190704"), NaiveDate::from_ymd_opt(2019, 7, 4));
    }
}
