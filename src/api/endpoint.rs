pub type Endpoint = str;

pub const AUTH: &Endpoint = "/iam/pub/0/auth/login";
pub const STATIONS: &Endpoint = "/pvm/api/0/station/select_by_page";
pub const DTUS: &Endpoint = "/pvm/api/0/dev/dtu/select_by_page";
pub const MICROINVERTERS: &Endpoint = "/pvm/api/0/dev/micro/select_by_station";
pub const STATION_REAL_DATA: &Endpoint = "/pvm-data/api/0/station/data/count_station_real_data";
pub const DTU_DETAIL: &Endpoint = "/pvm/api/0/dev/dtu/find";
pub const MICRO_DETAIL: &Endpoint = "/pvm/api/0/dev/micro/find";
