//! Localized conversational content for the photo-provisioning exchange and
//! token delivery.

use super::service::PhotoRequestKind;

/// Request wording varies with how the exchange was initiated.
pub fn photo_request(kind: PhotoRequestKind, name: &str) -> String {
    match kind {
        PhotoRequestKind::Change => format!(
            "Halo {name},\n\nAdmin telah memulai permintaan untuk mengganti foto profil Anda di sistem absensi.\n\nSilakan balas pesan ini dengan mengirimkan *satu foto baru* Anda. Jika batal, cukup balas dengan kata: *tidak*"
        ),
        PhotoRequestKind::FirstTime => {
            "Apakah Anda ingin menggunakan foto profil asli di QR Code? Jika ya, silakan kirim fotonya sekarang. Jika tidak, balas pesan ini dengan kata: *tidak*".to_string()
        }
        PhotoRequestKind::FollowUp => format!(
            "Halo {name},\n\nSistem absensi kami memerlukan foto profil Anda.\n\nSilakan balas pesan ini dengan mengirimkan *satu foto terbaik* Anda. Jika tidak ingin, balas pesan ini dengan kata: *tidak*"
        ),
    }
}

pub fn media_received() -> &'static str {
    "Terima kasih! Foto profil Anda telah berhasil diperbarui. 👍\n\nSaya akan kirimkan QR Code baru Anda..."
}

pub fn decline_acknowledged() -> &'static str {
    "Baik, terima kasih atas konfirmasinya. Jika di kemudian hari Anda ingin menggunakan foto, silakan hubungi admin."
}

/// Caption attached to a delivered identity-token image.
pub fn token_caption(name: &str, is_update: bool) -> String {
    if is_update {
        "Berikut adalah QR Code baru Anda dengan foto profil yang telah diperbarui. Gunakan yang ini untuk absensi selanjutnya ya!".to_string()
    } else {
        format!(
            "Halo {name},\n\nIni adalah QR Code pribadi Anda untuk absensi. Mohon simpan baik-baik."
        )
    }
}
