use crate::{
    client::Transport,
    error::{ManifestError, SegmentError},
    playlist::{KeyMethod, Manifest},
};
use aes::cipher::{BlockDecryptMut, KeyIvInit, block_padding::Pkcs7};

type Aes128CbcDec = cbc::Decryptor<aes::Aes128>;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum IvSource {
    /// Declared on the key line, shared by every segment.
    Fixed([u8; 16]),
    /// Not declared; each segment uses its media sequence number.
    Sequence(u64),
}

/// AES-128-CBC key material for one playlist.
///
/// Holds no cipher state. A fresh decryptor is built for every segment so the
/// context can be shared by all workers and used in any order.
#[derive(Clone, Debug)]
pub struct CipherContext {
    key: [u8; 16],
    iv: IvSource,
}

impl CipherContext {
    pub fn new(key: [u8; 16], iv: IvSource) -> Self {
        Self { key, iv }
    }

    pub fn iv_for(&self, index: usize) -> [u8; 16] {
        match &self.iv {
            IvSource::Fixed(iv) => *iv,
            IvSource::Sequence(sequence) => ((*sequence as u128) + index as u128).to_be_bytes(),
        }
    }

    /// Decrypts a whole segment body and strips its PKCS7 padding.
    pub fn decrypt(&self, index: usize, mut data: Vec<u8>) -> Result<Vec<u8>, SegmentError> {
        let iv = self.iv_for(index);

        Aes128CbcDec::new((&self.key).into(), (&iv).into())
            .decrypt_padded_mut::<Pkcs7>(&mut data)
            .map(|x| x.to_vec())
            .map_err(|x| SegmentError::Decrypt(x.to_string()))
    }
}

/// Builds the decryption context for `manifest`, fetching its key.
///
/// Only the first key line of the playlist is honoured.
pub async fn get_cipher(
    transport: &dyn Transport,
    manifest: &Manifest,
) -> Result<Option<CipherContext>, ManifestError> {
    let Some(key) = &manifest.key else {
        return Ok(None);
    };

    match &key.method {
        KeyMethod::None => Ok(None),
        KeyMethod::Other(x) => Err(ManifestError::UnsupportedKey(x.to_owned())),
        KeyMethod::Aes128 => {
            let uri = key
                .uri
                .as_ref()
                .ok_or_else(|| ManifestError::MissingKeyUri(manifest.url.to_string()))?;
            let bytes = transport.fetch(&manifest.join(uri)?).await?;
            let iv = match key.iv()? {
                Some(iv) => IvSource::Fixed(iv),
                None => IvSource::Sequence(manifest.media_sequence),
            };

            Ok(Some(CipherContext::new(key.key(&bytes)?, iv)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aes::cipher::BlockEncryptMut;

    type Aes128CbcEnc = cbc::Encryptor<aes::Aes128>;

    const KEY: [u8; 16] = *b"0123456789abcdef";

    #[test]
    fn sequence_iv_follows_segment_index() {
        let cipher = CipherContext::new(KEY, IvSource::Sequence(7));

        assert_eq!(cipher.iv_for(0), 7_u128.to_be_bytes());
        assert_eq!(cipher.iv_for(3), 10_u128.to_be_bytes());
    }

    #[test]
    fn fixed_iv_is_shared() {
        let cipher = CipherContext::new(KEY, IvSource::Fixed([9; 16]));

        assert_eq!(cipher.iv_for(0), cipher.iv_for(41));
    }

    #[test]
    fn segments_decrypt_out_of_order() {
        let cipher = CipherContext::new(KEY, IvSource::Sequence(0));
        let encrypt = |index: usize, plain: &[u8]| {
            Aes128CbcEnc::new((&KEY).into(), (&cipher.iv_for(index)).into())
                .encrypt_padded_vec_mut::<Pkcs7>(plain)
        };

        let second = encrypt(1, b"second segment");
        let first = encrypt(0, b"first");

        assert_eq!(cipher.decrypt(1, second).unwrap(), b"second segment");
        assert_eq!(cipher.decrypt(0, first).unwrap(), b"first");
    }

    #[test]
    fn bad_padding_is_an_error() {
        let cipher = CipherContext::new(KEY, IvSource::Fixed([0; 16]));

        assert!(matches!(
            cipher.decrypt(0, vec![1; 15]),
            Err(SegmentError::Decrypt(_))
        ));
    }
}
