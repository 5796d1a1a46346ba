pub const PAGE_SIZE: usize = 4096; // total page size in bytes (4 KB)
pub const PAGE_HEADER_SIZE: usize = 8; // num_records + next_free_page_no
pub const FILE_HEADER_SIZE: usize = 20; // five i32 fields on page 0

pub const FILE_HEADER_PAGE: i32 = 0; // page 0 holds the file header
pub const FIRST_DATA_PAGE: i32 = 1;

/// Sentinel terminating the free-page chain.
pub const NO_PAGE: i32 = -1;
