pub mod mock_tts;
