pub mod mock_storage_client;
