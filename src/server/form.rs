//! The upload page served at `GET /`.

use axum::response::Html;

/// Upload form: title, author, target format and the `.docx` file.
pub const UPLOAD_FORM: &str = r#"<!DOCTYPE html>
<html lang="pt-br">
<head>
    <meta charset="UTF-8">
    <title>Conversor de Word para eBook</title>
    <style>
        body {
            background: #f4f4f4;
            font-family: Arial, sans-serif;
            display: flex;
            justify-content: center;
            align-items: center;
            height: 100vh;
        }
        .container {
            background: white;
            padding: 30px 40px;
            border-radius: 10px;
            box-shadow: 0 0 20px rgba(0,0,0,0.1);
            width: 100%;
            max-width: 500px;
        }
        h2 {
            text-align: center;
            color: #333;
            margin-bottom: 20px;
        }
        label {
            font-weight: bold;
            display: block;
            margin-top: 15px;
        }
        input[type="text"], select, input[type="file"] {
            width: 100%;
            padding: 10px;
            margin-top: 5px;
            border-radius: 5px;
            border: 1px solid #ccc;
        }
        input[type="submit"] {
            background: #0066cc;
            color: white;
            padding: 12px;
            border: none;
            border-radius: 5px;
            cursor: pointer;
            margin-top: 20px;
            width: 100%;
            font-size: 16px;
        }
        input[type="submit"]:hover {
            background: #004d99;
        }
    </style>
</head>
<body>
    <div class="container">
        <h2>Conversor de Word para eBook</h2>
        <form method="POST" action="/upload" enctype="multipart/form-data">
            <label for="title">Título do eBook:</label>
            <input type="text" id="title" name="title" required>

            <label for="author">Autor:</label>
            <input type="text" id="author" name="author" required>

            <label for="format">Formato de saída:</label>
            <select id="format" name="format" required>
                <option value="epub">EPUB</option>
                <option value="pdf">PDF</option>
            </select>

            <label for="file">Arquivo Word (.docx):</label>
            <input type="file" id="file" name="file" accept=".docx" required>

            <input type="submit" value="Converter">
        </form>
    </div>
</body>
</html>
"#;

pub async fn index() -> Html<&'static str> {
    Html(UPLOAD_FORM)
}
