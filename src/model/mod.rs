//! Binary persistence of the recoverable recognizer state: eigen images,
//! average image, per-enrollee coefficients, labels and the distance
//! threshold. A model round-trips without re-running enrollment; loaded
//! recognizers answer image queries only.

use std::fs::File;
use std::io;
use std::io::{Cursor, Read, Write};
use std::path::Path;

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};

use crate::common::FloatImage;
use crate::error::{Error, Result};
use crate::recognizer::FaceRecognizer;

const MODEL_MAGIC: u32 = 0x4549_4746; // "EIGF"
const MODEL_VERSION: u32 = 1;

/// Load a recognizer from a model file.
pub fn load_model<P: AsRef<Path>>(path: P) -> Result<FaceRecognizer> {
    let mut buf = vec![];
    File::open(path)?.read_to_end(&mut buf)?;
    read_model(Cursor::new(buf))
}

/// Save a recognizer's recoverable state to a model file.
pub fn save_model<P: AsRef<Path>>(recognizer: &FaceRecognizer, path: P) -> Result<()> {
    let mut file = File::create(path)?;
    write_model(recognizer, &mut file)
}

pub fn read_model<R: Read>(reader: R) -> Result<FaceRecognizer> {
    ModelReader::new(reader).read()
}

pub fn write_model<W: Write>(recognizer: &FaceRecognizer, writer: &mut W) -> Result<()> {
    writer.write_u32::<LittleEndian>(MODEL_MAGIC)?;
    writer.write_u32::<LittleEndian>(MODEL_VERSION)?;

    let avg = recognizer.average_image();
    writer.write_u32::<LittleEndian>(avg.width())?;
    writer.write_u32::<LittleEndian>(avg.height())?;
    writer.write_f64::<LittleEndian>(recognizer.eigen_distance_threshold())?;

    writer.write_u32::<LittleEndian>(recognizer.eigen_images().len() as u32)?;
    for image in recognizer.eigen_images() {
        write_image(writer, image)?;
    }
    write_image(writer, avg)?;

    writer.write_u32::<LittleEndian>(recognizer.labels().len() as u32)?;
    for (label, values) in recognizer.labels().iter().zip(recognizer.eigen_values()) {
        writer.write_u32::<LittleEndian>(label.len() as u32)?;
        writer.write_all(label.as_bytes())?;
        for v in values {
            writer.write_f32::<LittleEndian>(*v)?;
        }
    }
    Ok(())
}

fn write_image<W: Write>(writer: &mut W, image: &FloatImage) -> io::Result<()> {
    for v in image.data() {
        writer.write_f32::<LittleEndian>(*v)?;
    }
    Ok(())
}

struct ModelReader<R> {
    reader: R,
}

impl<R: Read> ModelReader<R> {
    fn new(reader: R) -> Self {
        ModelReader { reader }
    }

    fn read(mut self) -> Result<FaceRecognizer> {
        if self.read_u32()? != MODEL_MAGIC {
            return Err(Error::InvalidModel("bad magic number".to_string()));
        }
        let version = self.read_u32()?;
        if version != MODEL_VERSION {
            return Err(Error::InvalidModel(format!(
                "unsupported model version {}",
                version
            )));
        }

        let width = self.read_u32()?;
        let height = self.read_u32()?;
        let threshold = self.reader.read_f64::<LittleEndian>()?;

        let num_eigen = self.read_u32()? as usize;
        let mut eigen_images = Vec::with_capacity(num_eigen);
        for _ in 0..num_eigen {
            eigen_images.push(self.read_image(width, height)?);
        }
        let average_image = self.read_image(width, height)?;

        let num_faces = self.read_u32()? as usize;
        let mut labels = Vec::with_capacity(num_faces);
        let mut eigen_values = Vec::with_capacity(num_faces);
        for _ in 0..num_faces {
            labels.push(self.read_label()?);
            let mut values = Vec::with_capacity(num_eigen);
            for _ in 0..num_eigen {
                values.push(self.read_f32()?);
            }
            eigen_values.push(values);
        }

        FaceRecognizer::from_parts(eigen_images, average_image, eigen_values, labels, threshold)
    }

    fn read_image(&mut self, width: u32, height: u32) -> Result<FloatImage> {
        let len = (width * height) as usize;
        let mut data = Vec::with_capacity(len);
        for _ in 0..len {
            data.push(self.read_f32()?);
        }
        FloatImage::from_vec(width, height, data)
    }

    fn read_label(&mut self) -> Result<String> {
        let len = self.read_u32()? as usize;
        let mut bytes = vec![0u8; len];
        self.reader.read_exact(&mut bytes)?;
        String::from_utf8(bytes)
            .map_err(|_| Error::InvalidModel("label is not valid utf-8".to_string()))
    }

    fn read_u32(&mut self) -> Result<u32> {
        Ok(self.reader.read_u32::<LittleEndian>()?)
    }

    fn read_f32(&mut self) -> Result<f32> {
        Ok(self.reader.read_f32::<LittleEndian>()?)
    }
}

#[cfg(test)]
mod tests {

    use super::*;
    use crate::common::TargetFace;

    fn gallery() -> Vec<TargetFace> {
        (0..3)
            .map(|i| {
                let data = (0..16).map(|p| (i * 40 + p * (i + 1)) as f32).collect();
                TargetFace {
                    key: format!("face-{}", i),
                    image: FloatImage::from_vec(4, 4, data).unwrap(),
                    points: None,
                    id: (i as i32 + 1) * 100,
                }
            })
            .collect()
    }

    #[test]
    fn test_round_trip_preserves_recognition() {
        let faces = gallery();
        let recognizer = FaceRecognizer::with_threshold(&faces, 1500.0).unwrap();

        let mut buf = Vec::new();
        write_model(&recognizer, &mut buf).unwrap();
        let loaded = read_model(Cursor::new(buf)).unwrap();

        assert_eq!(recognizer.labels(), loaded.labels());
        assert_eq!(recognizer.eigen_values(), loaded.eigen_values());
        assert_eq!(recognizer.average_image(), loaded.average_image());
        assert_eq!(1500.0, loaded.eigen_distance_threshold());

        let original = recognizer.recognize_image(&faces[1].image).unwrap();
        let rebuilt = loaded.recognize_image(&faces[1].image).unwrap();
        assert_eq!(original, rebuilt);
        assert_eq!(Some("face-1"), rebuilt.label.as_deref());
    }

    #[test]
    fn test_loaded_model_is_image_only() {
        let recognizer = FaceRecognizer::new(&gallery()).unwrap();
        let mut buf = Vec::new();
        write_model(&recognizer, &mut buf).unwrap();
        let loaded = read_model(Cursor::new(buf)).unwrap();
        assert!(!loaded.has_landmark_classifier());
    }

    #[test]
    fn test_bad_magic_is_rejected() {
        let mut buf = Vec::new();
        write_model(&FaceRecognizer::new(&gallery()).unwrap(), &mut buf).unwrap();
        buf[0] ^= 0xFF;
        assert!(matches!(
            read_model(Cursor::new(buf)),
            Err(Error::InvalidModel(_))
        ));
    }

    #[test]
    fn test_truncated_model_is_an_io_error() {
        let mut buf = Vec::new();
        write_model(&FaceRecognizer::new(&gallery()).unwrap(), &mut buf).unwrap();
        buf.truncate(buf.len() / 2);
        assert!(matches!(read_model(Cursor::new(buf)), Err(Error::Io(_))));
    }
}
