pub mod pad_data;
