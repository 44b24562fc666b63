mod clipboard_flow;
mod properties;
