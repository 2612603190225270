use super::error::Error;
use serde::Serialize;

/// Stations come back in one fixed-size page; accounts with more stations
/// than this see a truncated list.
pub const STATION_PAGE_SIZE: u32 = 10;
/// Devices come back in one page as well, no pagination loop.
pub const DEVICE_PAGE_SIZE: u32 = 1000;

#[derive(Debug, Serialize)]
pub struct Login {
    pub user_name: String,
    /// md5 hex digest, never the clear password.
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct StationPageQuery {
    pub page_size: u32,
    pub page_num: u32,
}

impl StationPageQuery {
    pub fn first_page() -> StationPageQuery {
        StationPageQuery {
            page_size: STATION_PAGE_SIZE,
            page_num: 1,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct DevicePageQuery {
    pub sid: i64,
    pub page_size: u32,
    pub page_num: u32,
    pub show_warn: u8,
}

impl DevicePageQuery {
    pub fn for_station(station_id: &str) -> Result<DevicePageQuery, Error> {
        Ok(DevicePageQuery {
            sid: numeric_id(station_id)?,
            page_size: DEVICE_PAGE_SIZE,
            page_num: 1,
            show_warn: 0,
        })
    }
}

#[derive(Debug, Serialize)]
pub struct StationQuery {
    pub sid: i64,
}

impl StationQuery {
    pub fn new(station_id: &str) -> Result<StationQuery, Error> {
        Ok(StationQuery {
            sid: numeric_id(station_id)?,
        })
    }
}

#[derive(Debug, Serialize)]
pub struct DeviceQuery {
    pub id: i64,
    pub sid: i64,
}

impl DeviceQuery {
    pub fn new(station_id: &str, device_id: &str) -> Result<DeviceQuery, Error> {
        Ok(DeviceQuery {
            id: numeric_id(device_id)?,
            sid: numeric_id(station_id)?,
        })
    }
}

/* Identifiers are strings in the model but integers on the wire. */
fn numeric_id(id: &str) -> Result<i64, Error> {
    id.parse()
        .map_err(|_| Error::Internal(format!("non-numeric identifier: {:?}", id)))
}
