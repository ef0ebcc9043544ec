pub mod cached_setting_oracle;
pub mod fixed_setting_oracle;
pub mod openai_setting_oracle;
