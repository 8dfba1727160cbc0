pub mod qr_expiry_sweep;
